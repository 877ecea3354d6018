//! Canonical people records: students, guardians, and the links between them.

pub mod guardians;
pub mod links;
pub mod students;
