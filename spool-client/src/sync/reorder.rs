//! Queue reorder: splice a job to a new index and renumber priorities
//!
//! Priorities are the queue positions, so they must stay a contiguous
//! 0..n run after every move. Splicing and renumbering happens here as a
//! pure function; the coordinator decides what to do with the result.

use crate::{ClientError, ClientResult};
use shared::models::PrintJob;

/// Move job `id` to `new_index` and renumber every priority.
///
/// The input must be priority-ordered (as served by the store); the
/// output is too. Moving a job onto its current index is a valid no-op.
pub fn splice(jobs: &[PrintJob], id: i64, new_index: usize) -> ClientResult<Vec<PrintJob>> {
    let from = jobs
        .iter()
        .position(|j| j.id == id)
        .ok_or_else(|| ClientError::NotFound(format!("Job {} not in queue", id)))?;

    if new_index >= jobs.len() {
        return Err(ClientError::Validation(format!(
            "Index {} out of range for a queue of {}",
            new_index,
            jobs.len()
        )));
    }

    let mut reordered = jobs.to_vec();
    let job = reordered.remove(from);
    reordered.insert(new_index, job);
    renumber(&mut reordered);
    Ok(reordered)
}

/// Rewrite priorities to match list positions.
pub fn renumber(jobs: &mut [PrintJob]) {
    for (index, job) in jobs.iter_mut().enumerate() {
        job.priority = index as u32;
    }
}

/// Whether priorities form exactly 0..len over a priority-ordered list.
pub fn is_contiguous(jobs: &[PrintJob]) -> bool {
    jobs.iter()
        .enumerate()
        .all(|(index, job)| job.priority == index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{EjectionConfig, JobStatus};

    fn queue(ids: &[i64]) -> Vec<PrintJob> {
        ids.iter()
            .enumerate()
            .map(|(index, &id)| PrintJob {
                id,
                name: None,
                filename: format!("part-{}.gcode", id),
                quantity: 1,
                sent: 0,
                priority: index as u32,
                groups: Vec::new(),
                status: JobStatus::Active,
                filament_g: None,
                ejection: EjectionConfig::default(),
            })
            .collect()
    }

    fn ids(jobs: &[PrintJob]) -> Vec<i64> {
        jobs.iter().map(|j| j.id).collect()
    }

    #[test]
    fn test_move_towards_tail() {
        let jobs = queue(&[1, 2, 3, 4]);
        let moved = splice(&jobs, 1, 2).unwrap();
        assert_eq!(ids(&moved), [2, 3, 1, 4]);
        assert!(is_contiguous(&moved));
    }

    #[test]
    fn test_move_towards_head() {
        let jobs = queue(&[1, 2, 3, 4]);
        let moved = splice(&jobs, 4, 0).unwrap();
        assert_eq!(ids(&moved), [4, 1, 2, 3]);
        assert!(is_contiguous(&moved));
    }

    #[test]
    fn test_move_onto_own_index_is_noop() {
        let jobs = queue(&[1, 2, 3]);
        let moved = splice(&jobs, 2, 1).unwrap();
        assert_eq!(ids(&moved), [1, 2, 3]);
        assert!(is_contiguous(&moved));
    }

    #[test]
    fn test_move_to_last_index() {
        let jobs = queue(&[1, 2, 3]);
        let moved = splice(&jobs, 1, 2).unwrap();
        assert_eq!(ids(&moved), [2, 3, 1]);
    }

    #[test]
    fn test_unknown_job_is_rejected() {
        let jobs = queue(&[1, 2]);
        assert!(matches!(
            splice(&jobs, 9, 0),
            Err(ClientError::NotFound(_))
        ));
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let jobs = queue(&[1, 2]);
        assert!(matches!(
            splice(&jobs, 1, 2),
            Err(ClientError::Validation(_))
        ));
        // empty queue can never satisfy the index bound
        assert!(splice(&[], 1, 0).is_err());
    }

    #[test]
    fn test_every_intervening_priority_shifts() {
        let jobs = queue(&[10, 20, 30, 40, 50]);
        let moved = splice(&jobs, 50, 1).unwrap();
        assert_eq!(ids(&moved), [10, 50, 20, 30, 40]);
        let priorities: Vec<u32> = moved.iter().map(|j| j.priority).collect();
        assert_eq!(priorities, [0, 1, 2, 3, 4]);
    }
}
