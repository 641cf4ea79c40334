//! One driver per published document. Each reads its previous output once,
//! runs its fetchers in sequence and replaces the file atomically. A fatal
//! error returns before anything is written.

pub mod daily;
pub mod markets;
pub mod prices;
