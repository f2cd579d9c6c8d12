/// Notification sent by the upstream PHY at an activity boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhyActivity {
    /// A reception starts; `duration_s` is the nominal airtime.
    RxStart { duration_s: f64 },
    /// The current reception finished and the frame was decoded.
    RxEndOk,
    /// The current reception finished with a corrupted frame.
    RxEndError,
    /// A transmission starts and lasts `duration_s`.
    TxStart { duration_s: f64 },
}

impl PhyActivity {
    /// Short label used in logs and trace files.
    pub fn label(&self) -> &'static str {
        match self {
            PhyActivity::RxStart { .. } => "rx_start",
            PhyActivity::RxEndOk => "rx_end_ok",
            PhyActivity::RxEndError => "rx_end_error",
            PhyActivity::TxStart { .. } => "tx_start",
        }
    }
}

/// Everything that can sit in the clock's event queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// Predictive-off timer of the power state tracker.
    ForcedIdle,
    /// End-of-transmission timer of the activity listener.
    ReturnToIdle,
    /// Periodic refresh of the energy source.
    SourceUpdate,
    /// Scripted or generated PHY notification.
    Phy(PhyActivity),
    /// Energy delivered to the source by a harvester.
    Harvest { energy_j: f64 },
}
