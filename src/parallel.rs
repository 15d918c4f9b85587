use crate::core::Contig;
use crate::Result;

/// Trait for types that can process contigs in parallel.
///
/// This is implemented by the **processor** not by the reader. See
/// [`WigReader::process_parallel`](crate::WigReader::process_parallel) for the
/// reader side.
///
/// Every thread works on its own clone of the processor, so shared results
/// must live behind something like an `Arc<Mutex<_>>`.
pub trait ParallelProcessor: Send + Clone {
    /// Process a single queried contig
    fn process_contig(&mut self, contig: Contig) -> Result<()>;

    /// Called when a thread finishes processing its batch
    /// Default implementation does nothing
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread should call this method with its own unique ID.
    fn set_tid(&mut self, _tid: usize) {
        // Default implementation does nothing
    }

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// Resolves a requested thread count (0 means one per CPU)
pub(crate) fn resolve_threads(num_threads: usize) -> usize {
    if num_threads == 0 {
        num_cpus::get()
    } else {
        num_threads.min(num_cpus::get())
    }
    .max(1)
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_resolve_threads() {
        assert_eq!(resolve_threads(0), num_cpus::get().max(1));
        assert_eq!(resolve_threads(1), 1);
        assert!(resolve_threads(usize::MAX) <= num_cpus::get().max(1));
    }
}
