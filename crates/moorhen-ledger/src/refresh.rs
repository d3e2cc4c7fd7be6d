/// Downstream collaborators that keep aggregate views of the ledger (the
/// banking overview, reporting indexes) and want a poke when ingestion adds
/// records.
pub trait RefreshSink {
    /// Called after a committed ingestion that inserted at least one record.
    /// Fire-and-forget: there is no acknowledgment, and no ingestion
    /// invariant depends on the sink having run.
    fn ledger_updated(&self, account_id: &str);
}
