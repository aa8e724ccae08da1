mod gate;
mod session;
mod token;


pub use gate::{Admission, DedupGate, SuppressReason};
pub use session::{ScanPipeline, ScanSession, ScanSessionBuilder};
pub use token::ScanToken;
