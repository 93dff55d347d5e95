use std::time::{Duration, Instant};

use log::{debug, warn};
use mongodb::{
    error::{Error as DbError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    Client, ClientSession,
};
use rand::Rng;
use rocket::http::Status;

use crate::error::{Error, Result};

/// How long a transaction may keep retrying before the last error is returned.
pub const TRANSACTION_TIME_LIMIT: Duration = Duration::from_secs(120);

/// Smallest and largest ceiling for the random delay between attempts.
const BASE_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(500);

/// A unit of work that must be applied to the database atomically.
///
/// `run` may be invoked several times if the server reports a transient
/// failure, so it must not have side effects outside of the session.
#[rocket::async_trait]
pub trait Transaction {
    type Output: Send;

    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, session: &mut ClientSession) -> Result<Self::Output>;
}

/// Run the given transaction to completion, retrying transient errors until
/// [`TRANSACTION_TIME_LIMIT`] has passed.
pub async fn run_transaction<T>(client: &Client, txn: &T) -> Result<T::Output>
where
    T: Transaction + Sync,
{
    run_transaction_within(client, txn, TRANSACTION_TIME_LIMIT).await
}

async fn run_transaction_within<T>(client: &Client, txn: &T, limit: Duration) -> Result<T::Output>
where
    T: Transaction + Sync,
{
    let deadline = Instant::now() + limit;
    let mut session = client.start_session(None).await?;
    let mut attempt = 1;

    loop {
        session.start_transaction(None).await?;

        let output = match txn.run(&mut session).await {
            Ok(output) => output,
            Err(err) => {
                // The server may already have aborted; nothing to do if so.
                let _ = session.abort_transaction().await;
                if should_retry(&err, deadline) {
                    debug!("Transient failure in {} (attempt {attempt}): {err}", txn.name());
                    rocket::tokio::time::sleep(jittered_backoff(attempt)).await;
                    attempt += 1;
                    continue;
                }
                return Err(give_up(txn.name(), attempt, err));
            }
        };

        match commit_with_retry(&mut session, deadline).await {
            Ok(()) => {
                debug!("Committed {} after {attempt} attempt(s)", txn.name());
                return Ok(output);
            }
            Err(err) if should_retry(&err, deadline) => {
                debug!("Transient commit failure in {} (attempt {attempt}): {err}", txn.name());
                rocket::tokio::time::sleep(jittered_backoff(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(give_up(txn.name(), attempt, err)),
        }
    }
}

/// A random delay whose ceiling doubles with each attempt, up to [`MAX_BACKOFF`].
///
/// Concurrent writers to the same document spread out instead of colliding again.
fn jittered_backoff(attempt: u32) -> Duration {
    let ceiling = BASE_BACKOFF
        .saturating_mul(1 << attempt.min(10))
        .min(MAX_BACKOFF);
    let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
    Duration::from_millis(millis)
}

/// Commit, retrying while the outcome of the commit is unknown and the deadline has not passed.
async fn commit_with_retry(session: &mut ClientSession, deadline: Instant) -> Result<()> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(err) if should_retry_commit(&err, deadline) => {
                warn!("Unknown commit result, retrying commit: {err}");
                rocket::tokio::time::sleep(jittered_backoff(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// The error to report for a failed transaction. Contention that outlasted the
/// time limit is reported as 503 so clients know to try again.
fn give_up(name: &str, attempts: u32, err: Error) -> Error {
    if !is_transient(&err) {
        return err;
    }
    warn!("Giving up on {name} after {attempts} attempt(s): {err}");
    Error::Status(
        Status::ServiceUnavailable,
        "The server is busy, please try again".to_string(),
    )
}

fn should_retry(err: &Error, deadline: Instant) -> bool {
    is_transient(err) && Instant::now() < deadline
}

fn should_retry_commit(err: &DbError, deadline: Instant) -> bool {
    err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) && Instant::now() < deadline
}

/// Is this a database error that the server flagged as safe to retry?
pub fn is_transient(err: &Error) -> bool {
    matches!(err, Error::Db(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use mongodb::{
        bson::{doc, from_document},
        error::{ErrorKind, WriteConcernError, WriteFailure},
    };
    use rocket::local::asynchronous::Client;

    use super::*;

    /// A database error carrying the given label, as the server reports it.
    fn labelled(label: &str) -> DbError {
        let concern: WriteConcernError = from_document(doc! {
            "code": 112,
            "codeName": "WriteConflict",
            "errmsg": "write conflict",
            "errorLabels": [label],
        })
        .unwrap();
        ErrorKind::Write(WriteFailure::WriteConcernError(concern)).into()
    }

    #[test]
    fn handler_errors_are_not_transient() {
        assert!(!is_transient(&Error::conflict("already voted")));
        assert!(!is_transient(&Error::not_found("Candidate")));
        assert!(is_transient(&Error::Db(labelled(TRANSIENT_TRANSACTION_ERROR))));
    }

    #[test]
    fn retries_stop_at_the_deadline() {
        let later = Instant::now() + Duration::from_secs(60);
        let passed = Instant::now() - Duration::from_millis(1);

        let conflict = Error::Db(labelled(TRANSIENT_TRANSACTION_ERROR));
        assert!(should_retry(&conflict, later));
        assert!(!should_retry(&conflict, passed));
        assert!(!should_retry(&Error::conflict("already voted"), later));

        // A commit whose outcome is unknown is retried only until the deadline.
        let unknown = labelled(UNKNOWN_TRANSACTION_COMMIT_RESULT);
        assert!(should_retry_commit(&unknown, later));
        assert!(!should_retry_commit(&unknown, passed));
        assert!(!should_retry_commit(&labelled(TRANSIENT_TRANSACTION_ERROR), later));
    }

    #[test]
    fn lasting_contention_is_unavailable() {
        let err = give_up("vote", 7, Error::Db(labelled(TRANSIENT_TRANSACTION_ERROR)));
        assert_eq!(err.status(), Status::ServiceUnavailable);
        let err = give_up("vote", 1, Error::conflict("already voted"));
        assert_eq!(err.status(), Status::Conflict);
    }

    #[test]
    fn backoff_is_bounded() {
        for attempt in 1..40 {
            assert!(jittered_backoff(attempt) <= MAX_BACKOFF);
        }
        assert!(jittered_backoff(1) <= BASE_BACKOFF * 2);
    }

    /// Fails every attempt with the given error, counting attempts.
    struct AlwaysFails {
        transient: bool,
        attempts: AtomicU32,
    }

    #[rocket::async_trait]
    impl Transaction for AlwaysFails {
        type Output = ();

        fn name(&self) -> &'static str {
            "failing transaction"
        }

        async fn run(&self, _session: &mut ClientSession) -> Result<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.transient {
                Err(Error::Db(labelled(TRANSIENT_TRANSACTION_ERROR)))
            } else {
                Err(Error::conflict("already voted"))
            }
        }
    }

    #[backend_test]
    async fn transient_failures_retry_until_the_limit(client: Client) {
        let db_client = client.rocket().state::<mongodb::Client>().unwrap();

        let transient = AlwaysFails {
            transient: true,
            attempts: AtomicU32::new(0),
        };
        let err = run_transaction_within(db_client, &transient, Duration::from_millis(300))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::ServiceUnavailable);
        assert!(transient.attempts.load(Ordering::SeqCst) > 1);

        let permanent = AlwaysFails {
            transient: false,
            attempts: AtomicU32::new(0),
        };
        let err = run_transaction(db_client, &permanent).await.unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(permanent.attempts.load(Ordering::SeqCst), 1);
    }
}
