//! Customer-facing texts: the voucher email and the calendar description.

use chrono::DateTime;
use chrono_tz::Tz;
use tera::{Context, Tera};

use crate::config::CompanyProfile;
use crate::entities::{BookingMetadata, EmailMessage};
use crate::error::{unexpected_error, Error};

const VOUCHER_TEMPLATE: &str = "voucher.html";
const NO_SPECIAL_REQUESTS: &str = "Aucune";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentMode {
    Online,
    OnBoard,
}

impl PaymentMode {
    fn line(&self) -> &'static str {
        match self {
            Self::Online => "Payée en ligne par carte bancaire.",
            Self::OnBoard => "Paiement à bord par carte bancaire ou espèces.",
        }
    }
}

pub struct Voucher<'a> {
    pub reference: &'a str,
    pub booking: &'a BookingMetadata,
    pub pickup_time: DateTime<Tz>,
    pub mode: PaymentMode,
}

pub fn templates() -> Result<Tera, Error> {
    let mut tera = Tera::default();

    tera.add_raw_template(VOUCHER_TEMPLATE, include_str!("../../templates/voucher.html.tera"))
        .map_err(unexpected_error)?;

    Ok(tera)
}

pub fn display_time(local: &DateTime<Tz>) -> String {
    local.format("%d/%m/%Y à %H:%M").to_string()
}

fn special_requests(booking: &BookingMetadata) -> &str {
    booking
        .special_requests
        .as_deref()
        .unwrap_or(NO_SPECIAL_REQUESTS)
}

pub fn calendar_summary(booking: &BookingMetadata) -> String {
    format!("Course VTC - {}", booking.name)
}

pub fn calendar_description(voucher: &Voucher) -> String {
    let booking = voucher.booking;

    [
        format!("Client: {} ({}, {})", booking.name, booking.email, booking.phone),
        format!("Passagers: {}", booking.passengers),
        format!("Départ: {}", booking.pickup_address),
        format!("Arrivée: {}", booking.dropoff_address),
        format!("Prix: {:.2} €", booking.price_amount),
        format!("Demandes: {}", special_requests(booking)),
        format!("Réservation N°: {}", voucher.reference),
        voucher.mode.line().to_string(),
    ]
    .join("\n")
}

pub fn render_email(
    tera: &Tera,
    voucher: &Voucher,
    company: &CompanyProfile,
) -> Result<EmailMessage, Error> {
    let booking = voucher.booking;
    let mut ctx = Context::new();

    ctx.insert("reference", voucher.reference);
    ctx.insert("name", &booking.name);
    ctx.insert("pickup_time", &display_time(&voucher.pickup_time));
    ctx.insert("pickup", &booking.pickup_address);
    ctx.insert("dropoff", &booking.dropoff_address);
    ctx.insert("passengers", &booking.passengers);
    ctx.insert("special_requests", special_requests(booking));
    ctx.insert("price", &format!("{:.2}", booking.price_amount));
    ctx.insert("payment_line", voucher.mode.line());
    ctx.insert("driver_name", &company.driver_name);
    ctx.insert("company_name", &company.name);
    ctx.insert("company_contact", &company.contact);
    ctx.insert("vtc_register_number", &company.vtc_register_number);

    let html = tera
        .render(VOUCHER_TEMPLATE, &ctx)
        .map_err(unexpected_error)?;

    let subject = match voucher.mode {
        PaymentMode::Online => format!(
            "Confirmation de votre réservation VTC N° {} (Payée)",
            voucher.reference
        ),
        PaymentMode::OnBoard => {
            format!("Confirmation de votre réservation VTC N° {}", voucher.reference)
        }
    };

    Ok(EmailMessage {
        to: booking.email.clone(),
        cc: Some(company.email_receiver.clone()).filter(|cc| !cc.is_empty()),
        subject,
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civil_time::{parse_civil_date_time, resolve_naive, Disambiguation};
    use crate::config::Config;
    use rust_decimal::Decimal;

    fn booking() -> BookingMetadata {
        BookingMetadata {
            name: "Camille <Martin>".into(),
            email: "camille@example.com".into(),
            phone: "0612345678".into(),
            pickup_address: "Gare de Grenoble".into(),
            dropoff_address: "Meylan".into(),
            passengers: 2,
            special_requests: None,
            booking_local_time: parse_civil_date_time("2024-07-15T14:00").unwrap(),
            duration_seconds: Some(1_200),
            distance_meters: Some(12_000),
            price_amount: Decimal::new(3410, 2),
        }
    }

    fn pickup_time(booking: &BookingMetadata) -> DateTime<Tz> {
        resolve_naive(
            booking.booking_local_time,
            chrono_tz::Europe::Paris,
            Disambiguation::Earliest,
        )
        .unwrap()
        .local()
    }

    #[test]
    fn voucher_shows_business_wall_clock() {
        let booking = booking();
        let voucher = Voucher {
            reference: "SC-123456",
            booking: &booking,
            pickup_time: pickup_time(&booking),
            mode: PaymentMode::Online,
        };

        let email = render_email(&templates().unwrap(), &voucher, &Config::for_tests().company)
            .unwrap();

        assert!(email.html.contains("15/07/2024 à 14:00"));
        assert!(email.html.contains("SC-123456"));
        assert!(email.html.contains("34.10 € TTC"));
        assert!(email.html.contains("Payée en ligne"));
        assert!(email.subject.ends_with("(Payée)"));
        assert_eq!(email.to, "camille@example.com");
        assert_eq!(email.cc.as_deref(), Some("bureau@chauffeur-alpes.test"));
    }

    #[test]
    fn voucher_escapes_customer_input() {
        let booking = booking();
        let voucher = Voucher {
            reference: "SC-123456",
            booking: &booking,
            pickup_time: pickup_time(&booking),
            mode: PaymentMode::OnBoard,
        };

        let email = render_email(&templates().unwrap(), &voucher, &Config::for_tests().company)
            .unwrap();

        assert!(!email.html.contains("<Martin>"));
        assert!(email.html.contains("&lt;Martin&gt;"));
        assert!(email.html.contains("Paiement à bord"));
    }

    #[test]
    fn description_lists_contact_and_route() {
        let booking = booking();
        let voucher = Voucher {
            reference: "SC-123456",
            booking: &booking,
            pickup_time: pickup_time(&booking),
            mode: PaymentMode::OnBoard,
        };

        let description = calendar_description(&voucher);

        assert!(description.contains("camille@example.com, 0612345678"));
        assert!(description.contains("Départ: Gare de Grenoble"));
        assert!(description.contains("Prix: 34.10 €"));
        assert!(description.contains("Demandes: Aucune"));
        assert!(description.contains("Réservation N°: SC-123456"));
    }
}
