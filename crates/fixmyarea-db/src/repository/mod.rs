//! SurrealDB repository implementations.

mod complaint;
mod dog;
mod location;
mod otp;
mod user;

pub use complaint::SurrealComplaintRepository;
pub use dog::SurrealDogRecordRepository;
pub use location::SurrealLocationRepository;
pub use otp::SurrealOtpRepository;
pub use user::SurrealUserRepository;
