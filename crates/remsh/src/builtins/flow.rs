//! true and false builtins

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::{Error, Result};

/// The true builtin - always succeeds.
pub struct True;

#[async_trait]
impl Builtin for True {
    async fn execute(&self, _ctx: Context<'_>) -> Result<()> {
        Ok(())
    }
}

/// The false builtin - always fails with status 1.
pub struct False;

#[async_trait]
impl Builtin for False {
    async fn execute(&self, _ctx: Context<'_>) -> Result<()> {
        Err(Error::ExitStatus(1))
    }
}
