pub mod availability;
pub mod department;
pub mod doctor;
pub mod time_slot;

pub use availability::AvailabilityService;
pub use department::DepartmentService;
pub use doctor::DoctorService;
pub use time_slot::TimeSlotService;
