// Suggestion routing and merge semantics: target path parsing, the applicator
// that produces a new document snapshot, and the pending/accepted/declined lifecycle.

pub mod applicator;
pub mod lifecycle;
pub mod path;
