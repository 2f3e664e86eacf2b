use log::{info, warn};
use std::collections::HashMap;

use crate::domain;
use crate::history::{mac_time_to_datetime, VisitRecord};
use crate::indicators::IndicatorSet;

/// Receives redirect-chain findings. Injected into the detector so analysis
/// can be exercised without a live logging subsystem.
pub trait DiagnosticSink {
    fn info(&mut self, message: String);
    fn warn(&mut self, message: String);
}

/// Forwards diagnostics to the `log` crate.
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn info(&mut self, message: String) {
        info!("{message}");
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
    }
}

/// Detects potential on-path network injection in a Safari visit sequence.
pub struct Detector {
    extractor: psl::List,
}

impl Detector {
    pub fn new() -> Self {
        Self {
            extractor: domain::new_extractor(),
        }
    }

    /// Chain analysis: flag plaintext-HTTP visits that redirected to a
    /// *different* registrable domain, and escalate when the redirect landed
    /// in under a second. Emits diagnostics only — a fast cross-domain
    /// redirect is a signal for the operator, not an automatic detection.
    pub fn find_injections(&self, records: &[VisitRecord], sink: &mut dyn DiagnosticSink) {
        // Resolve redirect references in O(1) instead of rescanning the
        // sequence for every origin.
        let by_visit_id: HashMap<i64, &VisitRecord> =
            records.iter().map(|r| (r.visit_id, r)).collect();

        for origin in records {
            // We presume injections only happen on plaintext HTTP visits.
            if !origin.url.to_lowercase().starts_with("http://") {
                continue;
            }

            // If there is no destination, no redirect happened.
            let Some(dest_id) = origin.redirect_destination else {
                continue;
            };

            let Some(origin_domain) = domain::registrable_domain(&self.extractor, &origin.url)
            else {
                continue;
            };

            // A destination pointing at no known visit is tolerated, not an error.
            let Some(redirect) = by_visit_id.get(&dest_id) else {
                continue;
            };

            let Some(redirect_domain) = domain::registrable_domain(&self.extractor, &redirect.url)
            else {
                continue;
            };

            // Same domain on both ends is most likely an HTTPS upgrade.
            if origin_domain == redirect_domain {
                continue;
            }

            sink.info(format!(
                "Found HTTP redirect to different domain: \"{origin_domain}\" -> \"{redirect_domain}\""
            ));

            let (Some(origin_time), Some(redirect_time)) = (
                mac_time_to_datetime(origin.timestamp),
                mac_time_to_datetime(redirect.timestamp),
            ) else {
                continue;
            };
            let elapsed = redirect_time - origin_time;

            if elapsed.num_seconds() == 0 {
                sink.warn(format!(
                    "Redirect took less than a second! ({} milliseconds)",
                    elapsed.num_milliseconds()
                ));
            }
        }
    }

    /// Run chain analysis, then flag every visit whose URL matches the
    /// indicator set. With no indicator set configured only the chain
    /// diagnostics are produced. Returned detections preserve input order
    /// and are never deduplicated.
    pub fn check_indicators(
        &self,
        records: &[VisitRecord],
        indicators: Option<&dyn IndicatorSet>,
        sink: &mut dyn DiagnosticSink,
    ) -> Vec<VisitRecord> {
        self.find_injections(records, sink);

        let Some(indicators) = indicators else {
            return Vec::new();
        };

        let mut detected = Vec::new();
        for record in records {
            if indicators.matches(&record.url) {
                detected.push(record.clone());
            }
        }
        detected
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new()
    }
}
