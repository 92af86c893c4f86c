//! Bounded concurrent upload of binary file contents.

use super::builder::Diff;
use super::change::Upload;
use crate::cancel::CancelFlag;
use crate::conduit::{ConduitApi, LookupCache, Phabricator, file_name};
use crate::error::{PhabError, Result};
use std::sync::OnceLock;
use tracing::debug;

struct UploadJob<'a> {
    name: String,
    upload: &'a mut Upload,
}

impl Diff {
    /// Upload every binary side of every change, storing the returned PHIDs.
    ///
    /// At most `workers` uploads run at once. The call returns once all of
    /// them finished; the first failure observed is returned and any later
    /// ones are dropped. Each worker only writes the upload it took.
    pub fn upload_files<C: ConduitApi, K: LookupCache>(
        &mut self,
        phab: &Phabricator<C, K>,
        workers: usize,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let mut jobs = Vec::new();
        for change in self.changes.values_mut() {
            let names: Vec<String> = change
                .uploads
                .iter()
                .map(|upload| file_name(change.path_for(upload.slot)))
                .collect();
            for (upload, name) in change.uploads.iter_mut().zip(names) {
                if !upload.bytes.is_empty() {
                    jobs.push(UploadJob { name, upload });
                }
            }
        }

        if jobs.is_empty() {
            return Ok(());
        }

        let workers = workers.max(1).min(jobs.len());
        debug!(files = jobs.len(), workers, "uploading binary files");

        let (sender, receiver) = crossbeam_channel::unbounded();
        for job in jobs {
            // The receiver is alive until the scope below ends.
            let _ = sender.send(job);
        }
        drop(sender);

        let first_error: OnceLock<PhabError> = OnceLock::new();
        std::thread::scope(|scope| {
            for _ in 0..workers {
                let receiver = receiver.clone();
                let first_error = &first_error;
                scope.spawn(move || {
                    for job in receiver.iter() {
                        if let Err(e) = cancel.check() {
                            let _ = first_error.set(e);
                            continue;
                        }
                        match phab.upload_file(&job.upload.bytes, &job.name) {
                            Ok(phid) => job.upload.phid = phid,
                            Err(e) => {
                                let _ = first_error.set(upload_error(&job.name, e));
                            }
                        }
                    }
                });
            }
        });

        match first_error.into_inner() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn upload_error(name: &str, error: PhabError) -> PhabError {
    match error {
        PhabError::Interrupted => PhabError::Interrupted,
        other => PhabError::UploadError(format!("{}: {}", name, other)),
    }
}
