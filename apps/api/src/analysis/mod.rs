// Resume analysis: heuristic scorer, keyword vocabulary, delayed scheduling
// and the HTTP handlers that expose them.

pub mod handlers;
pub mod keywords;
pub mod models;
pub mod scheduler;
pub mod scorer;
