pub mod internships;
