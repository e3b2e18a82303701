mod account;
mod announcement;
mod farm;
mod faq;

pub use account::{Account, Role, SubRole};
pub use announcement::{format_date, Announcement, AnnouncementType};
pub use farm::Farm;
pub use faq::{Faq, FaqCategory};
