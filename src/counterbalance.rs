//! Task-order counterbalancing
//!
//! Each participant sees the study's tasks in an independently shuffled
//! order so that ordering effects cancel out across participants.

use crate::types::Task;
use rand::seq::SliceRandom;
use rand::Rng;

/// Shuffled copy of `tasks` for one participant
pub fn presentation_order<R>(tasks: &[Task], rng: &mut R) -> Vec<Task>
where
    R: Rng + ?Sized,
{
    let mut ordered = tasks.to_vec();
    ordered.shuffle(rng);
    ordered
}
