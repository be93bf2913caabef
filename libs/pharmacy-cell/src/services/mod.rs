pub mod medicine;
pub mod prescription;

pub use medicine::MedicineService;
pub use prescription::PrescriptionService;
