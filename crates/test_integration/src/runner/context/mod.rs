pub mod scripted_model;
pub mod test_context;
