use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("credential acquisition failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}
