pub mod ledger;
pub mod pacer;
pub mod question_resolver;

pub use ledger::{Ledger, LedgerEntry, LedgerStore, MemoryLedgerStore};
pub use pacer::Pacer;
pub use question_resolver::{AnswerSource, QuestionResolver, Resolution};
