pub mod car;
pub mod conversation;
pub mod inquiry;
pub mod lead;
pub mod message;
pub mod notification;
pub mod profile;
pub mod stats;

pub use car::{Car, CarCategory, CarDraft, CarStatus};
pub use conversation::{Conversation, NewConversation};
pub use inquiry::{Inquiry, InquiryChanges, NewInquiry};
pub use lead::{Lead, LeadChanges, LeadStatus, NewLead};
pub use message::{DirectMessage, MessageType, NewDirectMessage};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use profile::{Profile, Role};
pub use stats::DashboardStats;
