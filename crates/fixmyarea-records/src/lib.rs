//! Record lifecycles for FixMyArea: resident complaints, stray-dog
//! records, complaint reports and the location directory.

pub mod complaint;
pub mod dog;
pub mod location;
pub mod report;

pub use complaint::{ComplaintService, ComplaintView};
pub use dog::DogService;
pub use location::LocationDirectory;
pub use report::{GroupCount, ReportDimension, ReportService, StaffPerformance};
