pub mod firebase;

pub use firebase::{FirebaseService, FirebaseUser};
