use serde::{Deserialize, Serialize};

use crate::entities::BookingMetadata;

const RETURN_UNAVAILABLE: &str = "Erreur calcul";
const TOTAL_UNAVAILABLE: &str = "N/A";

/// One line of the mileage ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripLogRow {
    pub when_local: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub pickup: String,
    pub dropoff: String,
    pub outbound_km: f64,
    pub return_km: Option<f64>,
    pub total_km: Option<f64>,
}

impl TripLogRow {
    pub fn new(
        when_local: String,
        booking: &BookingMetadata,
        outbound_meters: u64,
        return_meters: Option<u64>,
    ) -> Self {
        let outbound_km = to_km(outbound_meters);
        let return_km = return_meters.map(to_km);

        Self {
            when_local,
            name: booking.name.clone(),
            email: booking.email.clone(),
            phone: booking.phone.clone(),
            pickup: booking.pickup_address.clone(),
            dropoff: booking.dropoff_address.clone(),
            outbound_km,
            return_km,
            total_km: return_km.map(|km| outbound_km + km),
        }
    }

    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.when_local.clone(),
            as_text(&self.name),
            as_text(&self.email),
            as_text(&self.phone),
            as_text(&self.pickup),
            as_text(&self.dropoff),
            format!("{:.2}", self.outbound_km),
            self.return_km
                .map(|km| format!("{:.2}", km))
                .unwrap_or_else(|| RETURN_UNAVAILABLE.into()),
            self.total_km
                .map(|km| format!("{:.2}", km))
                .unwrap_or_else(|| TOTAL_UNAVAILABLE.into()),
        ]
    }
}

/// The ledger is appended with `USER_ENTERED`, so customer text that looks
/// like a formula is quoted to stay a literal.
fn as_text(value: &str) -> String {
    match value.chars().next() {
        Some('=' | '+' | '-' | '@') => format!("'{}", value),
        _ => value.to_string(),
    }
}

fn to_km(meters: u64) -> f64 {
    meters as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civil_time::parse_civil_date_time;
    use rust_decimal::Decimal;

    fn booking() -> BookingMetadata {
        BookingMetadata {
            name: "Camille Martin".into(),
            email: "camille@example.com".into(),
            phone: "0612345678".into(),
            pickup_address: "Gare de Grenoble".into(),
            dropoff_address: "Meylan".into(),
            passengers: 1,
            special_requests: None,
            booking_local_time: parse_civil_date_time("2024-07-15T14:00").unwrap(),
            duration_seconds: None,
            distance_meters: None,
            price_amount: Decimal::new(2000, 2),
        }
    }

    #[test]
    fn cells_carry_two_decimal_distances() {
        let row = TripLogRow::new("15/07/2024 14:00:00".into(), &booking(), 12_300, Some(30_200));

        let cells = row.to_cells();

        assert_eq!(cells.len(), 9);
        assert_eq!(cells[0], "15/07/2024 14:00:00");
        assert_eq!(cells[6], "12.30");
        assert_eq!(cells[7], "30.20");
        assert_eq!(cells[8], "42.50");
    }

    #[test]
    fn missing_return_distance_is_marked() {
        let row = TripLogRow::new("15/07/2024 14:00:00".into(), &booking(), 12_000, None);

        let cells = row.to_cells();

        assert_eq!(cells[7], "Erreur calcul");
        assert_eq!(cells[8], "N/A");
    }

    #[test]
    fn formula_like_customer_text_stays_literal() {
        let mut booking = booking();
        booking.name = "=HYPERLINK(\"https://evil.test\",\"Camille\")".into();
        booking.phone = "+33612345678".into();
        booking.pickup_address = "@Gare".into();

        let cells = TripLogRow::new("15/07/2024 14:00:00".into(), &booking, 12_000, None).to_cells();

        assert_eq!(cells[1], "'=HYPERLINK(\"https://evil.test\",\"Camille\")");
        assert_eq!(cells[3], "'+33612345678");
        assert_eq!(cells[4], "'@Gare");
        assert_eq!(cells[5], "Meylan");
    }
}
