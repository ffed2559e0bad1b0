//! Conversion of metered generation (kWh) into carbon credit records.
//!
//! The converter applies a static emission factor (kg CO₂ avoided per kWh)
//! and hands the resulting record to a [`CreditLedger`] for signing and
//! storage. It never touches the store directly.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use ccl_types::{LedgerEntry, Payload, Timestamp, CREDITS_FIELD, DEVICE_FIELD};

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::CreditLedger;

/// Emission factor used when none is configured.
pub const DEFAULT_EMISSION_FACTOR: f64 = 1.0;

const KWH_FIELD: &str = "kWh";
const FACTOR_FIELD: &str = "emissionFactor";
const CONVERSION_METHOD: &str = "static_factor";
const CONVERSION_VERSION: &str = "1.0.0";

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A generation reading reported by a device.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub device_id: String,
    #[serde(rename = "kWh")]
    pub kwh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_type: Option<String>,
    /// Device-reported reading time, recorded exactly as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl Reading {
    pub fn new(device_id: impl Into<String>, kwh: f64) -> Self {
        Self {
            device_id: device_id.into(),
            kwh,
            profile_type: None,
            timestamp: None,
            location: None,
            coordinates: None,
        }
    }

    fn validate(&self) -> LedgerResult<()> {
        if self.device_id.trim().is_empty() {
            return Err(LedgerError::InvalidReading("deviceId is required".into()));
        }
        Ok(())
    }
}

/// Totals over the credit records in a ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    #[serde(rename = "totalEntries")]
    pub total_entries: usize,
    #[serde(rename = "totalDevices")]
    pub total_devices: usize,
    #[serde(rename = "totalKWh")]
    pub total_kwh: f64,
    #[serde(rename = "totalCarbonCredits")]
    pub total_carbon_credits: f64,
    #[serde(rename = "averageEmissionFactor")]
    pub average_emission_factor: f64,
}

/// Turns kWh readings into signed ledger entries.
#[derive(Clone, Debug, PartialEq)]
pub struct CreditConverter {
    emission_factor: f64,
}

impl Default for CreditConverter {
    fn default() -> Self {
        Self {
            emission_factor: DEFAULT_EMISSION_FACTOR,
        }
    }
}

impl CreditConverter {
    /// A converter with the given factor; it must be finite and positive.
    pub fn new(emission_factor: f64) -> LedgerResult<Self> {
        if !emission_factor.is_finite() || emission_factor <= 0.0 {
            return Err(LedgerError::Config(format!(
                "emission factor must be a positive number, got {emission_factor}"
            )));
        }
        Ok(Self { emission_factor })
    }

    pub fn emission_factor(&self) -> f64 {
        self.emission_factor
    }

    /// Credits (kg CO₂) for `kwh`, rounded to three decimals.
    pub fn convert_to_credits(&self, kwh: f64) -> LedgerResult<f64> {
        if !kwh.is_finite() || kwh < 0.0 {
            return Err(LedgerError::InvalidReading(format!("invalid kWh value: {kwh}")));
        }
        Ok(round3(kwh * self.emission_factor))
    }

    /// The payload recorded in the ledger for `reading`.
    pub fn credit_record(&self, reading: &Reading) -> LedgerResult<Payload> {
        reading.validate()?;
        let credits = self.convert_to_credits(reading.kwh)?;

        let mut record = Payload::new();
        record.insert(DEVICE_FIELD.into(), Value::String(reading.device_id.clone()));
        if let Some(profile) = &reading.profile_type {
            record.insert("profileType".into(), Value::String(profile.clone()));
        }
        if let Some(at) = &reading.timestamp {
            record.insert("timestamp".into(), at.clone());
        }
        if let Some(location) = &reading.location {
            record.insert("location".into(), Value::String(location.clone()));
        }
        if let Some(c) = reading.coordinates {
            record.insert("coordinates".into(), json!({"lat": c.lat, "lng": c.lng}));
        }
        record.insert(KWH_FIELD.into(), json!(reading.kwh));
        record.insert(CREDITS_FIELD.into(), json!(credits));
        record.insert(FACTOR_FIELD.into(), json!(self.emission_factor));
        record.insert(
            "metadata".into(),
            json!({
                "conversionTimestamp": Timestamp::now().to_iso8601(),
                "conversionMethod": CONVERSION_METHOD,
                "conversionVersion": CONVERSION_VERSION,
            }),
        );
        Ok(record)
    }

    /// Convert `reading` and append it to `ledger`.
    pub fn process_reading(
        &self,
        ledger: &CreditLedger,
        reading: &Reading,
    ) -> LedgerResult<LedgerEntry> {
        let record = self.credit_record(reading)?;
        let entry = ledger.add_payload(record)?;
        debug!(id = %entry.id, device = %reading.device_id, kwh = reading.kwh, "reading converted");
        Ok(entry)
    }

    /// Total credits recorded for one device.
    pub fn credits_by_device(&self, ledger: &CreditLedger, device_id: &str) -> f64 {
        ledger
            .entries_by_device(device_id)
            .iter()
            .map(LedgerEntry::credits)
            .sum()
    }

    /// Totals over every entry in `ledger`.
    ///
    /// The average factor is the configured one unless entries were
    /// recorded under more than one factor, in which case it is total
    /// credits over total kWh.
    pub fn conversion_stats(&self, ledger: &CreditLedger) -> ConversionStats {
        let entries = ledger.entries();
        let devices: HashSet<&str> = entries.iter().filter_map(LedgerEntry::device_id).collect();
        let total_kwh: f64 = entries
            .iter()
            .filter_map(|e| e.number_field(KWH_FIELD))
            .sum();
        let total_carbon_credits: f64 = entries.iter().map(LedgerEntry::credits).sum();
        let factors: HashSet<Option<u64>> = entries
            .iter()
            .map(|e| e.number_field(FACTOR_FIELD).map(f64::to_bits))
            .collect();

        let average_emission_factor = if factors.len() > 1 && total_kwh > 0.0 {
            total_carbon_credits / total_kwh
        } else {
            self.emission_factor
        };

        ConversionStats {
            total_entries: entries.len(),
            total_devices: devices.len(),
            total_kwh,
            total_carbon_credits,
            average_emission_factor,
        }
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerOptions;
    use ccl_crypto::{SignatureAlgorithm, Signer};
    use ccl_store::MemoryStore;

    fn ledger() -> CreditLedger {
        let signer = Signer::new("k".parse().unwrap(), SignatureAlgorithm::HmacSha256);
        CreditLedger::open(MemoryStore::new(), signer, LedgerOptions::default()).unwrap()
    }

    #[test]
    fn factor_must_be_positive() {
        assert!(CreditConverter::new(0.5).is_ok());
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(CreditConverter::new(bad), Err(LedgerError::Config(_))));
        }
    }

    #[test]
    fn converts_and_rounds() {
        let c = CreditConverter::new(0.4).unwrap();
        assert_eq!(c.convert_to_credits(10.0).unwrap(), 4.0);
        assert_eq!(c.convert_to_credits(1.23456).unwrap(), 0.494);
        assert_eq!(c.convert_to_credits(0.0).unwrap(), 0.0);
        assert!(c.convert_to_credits(-1.0).is_err());
        assert!(c.convert_to_credits(f64::NAN).is_err());
    }

    #[test]
    fn credit_record_layout() {
        let c = CreditConverter::default();
        let mut reading = Reading::new("sim-1", 5.0);
        reading.location = Some("Recife".into());
        reading.coordinates = Some(Coordinates { lat: -8.05, lng: -34.9 });

        let record = c.credit_record(&reading).unwrap();
        assert_eq!(record["deviceId"], "sim-1");
        assert_eq!(record["kWh"], 5.0);
        assert_eq!(record["carbonCredits"], 5.0);
        assert_eq!(record["emissionFactor"], 1.0);
        assert_eq!(record["location"], "Recife");
        assert_eq!(record["coordinates"]["lat"], -8.05);
        assert_eq!(record["metadata"]["conversionMethod"], "static_factor");
        assert_eq!(record["metadata"]["conversionVersion"], "1.0.0");
        assert!(!record.contains_key("profileType"));
        assert!(!record.contains_key("timestamp"));
    }

    #[test]
    fn reading_wire_names() {
        let reading: Reading = serde_json::from_value(json!({
            "deviceId": "sim-2",
            "kWh": 3.5,
            "profileType": "residential",
            "timestamp": "2025-01-01T12:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(reading.device_id, "sim-2");
        assert_eq!(reading.kwh, 3.5);
        assert_eq!(reading.profile_type.as_deref(), Some("residential"));
        assert!(reading.coordinates.is_none());
    }

    #[test]
    fn reading_timestamp_is_recorded_verbatim() {
        let reading: Reading = serde_json::from_value(json!({
            "deviceId": "sim-3",
            "kWh": 1.0,
            "timestamp": "2025-01-01T09:00:00-03:00"
        }))
        .unwrap();
        let record = CreditConverter::default().credit_record(&reading).unwrap();
        assert_eq!(record["timestamp"], "2025-01-01T09:00:00-03:00");

        let mut epoch = Reading::new("sim-3", 1.0);
        epoch.timestamp = Some(json!(1735732800));
        let record = CreditConverter::default().credit_record(&epoch).unwrap();
        assert_eq!(record["timestamp"], 1735732800);
    }

    #[test]
    fn process_reading_appends_signed_entry() {
        let ledger = ledger();
        let c = CreditConverter::new(0.5).unwrap();
        let entry = c.process_reading(&ledger, &Reading::new("sim-1", 8.0)).unwrap();
        assert_eq!(entry.credits(), 4.0);
        assert!(ledger.signer().verify(&entry));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn invalid_readings_are_not_recorded() {
        let ledger = ledger();
        let c = CreditConverter::default();
        assert!(matches!(
            c.process_reading(&ledger, &Reading::new("  ", 1.0)),
            Err(LedgerError::InvalidReading(_))
        ));
        assert!(matches!(
            c.process_reading(&ledger, &Reading::new("sim-1", -2.0)),
            Err(LedgerError::InvalidReading(_))
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn totals_per_device() {
        let ledger = ledger();
        let c = CreditConverter::default();
        c.process_reading(&ledger, &Reading::new("a", 1.5)).unwrap();
        c.process_reading(&ledger, &Reading::new("b", 2.0)).unwrap();
        c.process_reading(&ledger, &Reading::new("a", 2.5)).unwrap();
        assert_eq!(c.credits_by_device(&ledger, "a"), 4.0);
        assert_eq!(c.credits_by_device(&ledger, "missing"), 0.0);
    }

    #[test]
    fn stats_with_single_factor_report_configured_factor() {
        let ledger = ledger();
        let c = CreditConverter::new(0.5).unwrap();
        c.process_reading(&ledger, &Reading::new("a", 2.0)).unwrap();
        c.process_reading(&ledger, &Reading::new("b", 4.0)).unwrap();

        let stats = c.conversion_stats(&ledger);
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.total_devices, 2);
        assert_eq!(stats.total_kwh, 6.0);
        assert_eq!(stats.total_carbon_credits, 3.0);
        assert_eq!(stats.average_emission_factor, 0.5);
    }

    #[test]
    fn stats_with_mixed_factors_use_ratio() {
        let ledger = ledger();
        CreditConverter::new(1.0)
            .unwrap()
            .process_reading(&ledger, &Reading::new("a", 2.0))
            .unwrap();
        let c = CreditConverter::new(0.5).unwrap();
        c.process_reading(&ledger, &Reading::new("a", 2.0)).unwrap();

        let stats = c.conversion_stats(&ledger);
        assert_eq!(stats.total_carbon_credits, 3.0);
        assert_eq!(stats.average_emission_factor, 0.75);
        assert_eq!(
            serde_json::to_value(&stats).unwrap()["averageEmissionFactor"],
            json!(0.75)
        );
    }

    #[test]
    fn empty_ledger_stats() {
        let stats = CreditConverter::default().conversion_stats(&ledger());
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_kwh, 0.0);
        assert_eq!(stats.average_emission_factor, 1.0);
    }
}
