pub mod clock;
pub mod password;

pub use clock::{Clock, SystemClock};
pub use password::{Argon2Hasher, Password, PasswordHashString, PasswordHasher};
