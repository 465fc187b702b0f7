use super::Keeper;
use crate::address::ConsAddress;
use crate::context::Context;
use crate::error::Result;
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::types::CommitInfo;

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    /// Start-of-block hook: allocate the previous block's fees, then remember
    /// this block's proposer.
    ///
    /// Nothing is allocated at height 1 since there is no previous block.
    pub fn begin_block(&self, ctx: &mut Context, proposer: &ConsAddress, last_commit: &CommitInfo) -> Result<()> {
        if ctx.block_height() > 1 {
            self.allocate_tokens(ctx, last_commit.total_power(), &last_commit.votes)?;
        }

        // written every block so a restart resumes from the same proposer
        self.set_previous_proposer(ctx, proposer)
    }
}
