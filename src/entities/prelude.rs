pub use super::episodes::Entity as Episodes;
pub use super::shows::Entity as Shows;
