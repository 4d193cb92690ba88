pub mod aggregate;
pub mod marker;
pub mod publish;
pub mod replies;
pub mod report;
pub mod runner;
pub mod window;

pub use aggregate::{aggregate, Aggregates, AuthorGroups};
pub use marker::MarkerFormat;
pub use publish::{is_affirmative, Confirm, PrintReason, PublishOutcome, Publisher, StdinConfirm};
pub use replies::collect_replies;
pub use report::{Report, ReportTemplate, Reporter, SectionCounts};
pub use runner::{RunOptions, RunOutcome, StatsRun};
pub use window::{initial_window, Batch, Selection, SelectionRequest, WindowSelector};
