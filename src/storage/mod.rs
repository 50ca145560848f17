//! Durable side of the store. The layout is:
//!  - A [kv::KeyValueStorage] holds named string slots.
//!  - Each slot holds a full JSON snapshot of one piece of store state, see [slots::SlotKey].
//!  - Snapshots are rewritten whole on every change, nothing is appended.

pub mod kv;
pub mod slots;
