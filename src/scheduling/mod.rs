pub(crate) mod delivery;
mod scanner;
mod scheduler;

pub use delivery::LogDeliveryChannel;
pub use scanner::DueReminderScanner;
pub use scheduler::ReminderScheduler;
