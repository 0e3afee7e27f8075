pub mod event;
pub mod profile;

pub use event::EventRecord;
pub use profile::{Profession, ProfileDetails, ProfileEntry, Status, Trap, Unit, UserId};
