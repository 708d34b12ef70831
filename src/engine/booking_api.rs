use super::{
    voucher::{self, PaymentMode, Voucher},
    Engine,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::{
    api::BookingAPI,
    civil_time::{resolve_naive, ResolvedInstant},
    entities::{
        to_minor_units, BookingMetadata, CalendarEvent, Claim, FinalizationRecord,
        FinalizationResult, PaymentRef, Receipt, TripLogRow,
    },
    error::{
        calendar_write_failed_error,
        email_send_failed_error,
        finalization_in_progress_error,
        invalid_input_error,
        trip_log_failed_error,
        Error,
    },
};

const LEDGER_TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// When the ride occupies the driver's calendar.
#[derive(Clone, Copy, Debug)]
struct RideWindow {
    start: ResolvedInstant,
    end: DateTime<Utc>,
}

fn calendar_failure(err: Error) -> Error {
    if err.is_calendar_write_failed_error() {
        return err;
    }
    calendar_write_failed_error(err)
}

fn email_failure(err: Error) -> Error {
    if err.is_email_send_failed_error() || err.is_invalid_input_error() {
        return err;
    }
    email_send_failed_error(err)
}

/// A webhook may only finalize what was actually charged.
fn check_paid_amount(booking: &BookingMetadata, payment: &PaymentRef) -> Result<(), Error> {
    let paid = match payment.amount_paid_minor {
        Some(paid) => paid,
        None => return Ok(()),
    };

    let expected = to_minor_units(booking.price_amount)
        .ok_or_else(|| invalid_input_error("price is out of range"))?;

    if paid != expected {
        return Err(invalid_input_error(format!(
            "session {} paid {} cents for a {} cents booking",
            payment.session_id, paid, expected
        )));
    }

    Ok(())
}

impl Engine {
    fn ride_window(&self, booking: &BookingMetadata) -> Result<RideWindow, Error> {
        let policy = &self.config.booking;

        let start = resolve_naive(
            booking.booking_local_time,
            policy.time_zone,
            policy.ambiguous_local_time,
        )?;
        let seconds = booking.ride_seconds(policy.default_ride_seconds);
        let end = Duration::try_seconds(seconds)
            .and_then(|length| start.instant.checked_add_signed(length))
            .ok_or_else(|| {
                invalid_input_error(format!("a {} seconds ride is out of range", seconds))
            })?;

        Ok(RideWindow { start, end })
    }

    /// Calendar, then email, then the trip ledger. Progress is written back
    /// after each hard step so a retry resumes where the last attempt stopped.
    #[tracing::instrument(skip_all, fields(reference = %record.booking_reference))]
    async fn run_steps(
        &self,
        mut record: FinalizationRecord,
        booking: &BookingMetadata,
        window: RideWindow,
        mode: PaymentMode,
    ) -> Result<Receipt, Error> {
        let tracked = !record.session_id.is_empty();
        let voucher = Voucher {
            reference: &record.booking_reference,
            booking,
            pickup_time: window.start.local(),
            mode,
        };

        let message = voucher::render_email(&self.templates, &voucher, &self.config.company)?;

        let event_id = match record.calendar_event_id.clone() {
            Some(id) => {
                tracing::info!("calendar event {} already written", id);
                id
            }
            None => {
                let event = CalendarEvent {
                    id: record.calendar_event_id(),
                    summary: voucher::calendar_summary(booking),
                    description: voucher::calendar_description(&voucher),
                    start: window.start.instant,
                    end: window.end,
                    time_zone: window.start.zone.name().to_string(),
                };

                self.bounded(self.calendar.insert_event(&event))
                    .await
                    .map_err(calendar_failure)?
            }
        };

        if record.calendar_event_id.is_none() {
            record.calendar_event_id = Some(event_id.clone());
            if tracked {
                self.finalizations.save_progress(&record).await?;
            }
        }

        if record.email_sent {
            tracing::info!("confirmation email already sent");
        } else {
            self.bounded(self.mailer.send(&message))
                .await
                .map_err(email_failure)?;

            record.email_sent = true;
            if tracked {
                self.finalizations.save_progress(&record).await?;
            }
        }

        if !record.trip_logged {
            record.trip_logged = match self.log_trip(booking, &window).await {
                Ok(()) => true,
                Err(err) => {
                    tracing::warn!("trip not logged: {}", err);
                    false
                }
            };
        }

        if tracked {
            self.finalizations.complete(&record).await?;
        }

        tracing::info!("booking {} finalized", record.booking_reference);

        Ok(Receipt {
            booking_reference: record.booking_reference,
            calendar_event_id: Some(event_id),
            start: window.start.instant,
            end: window.end,
            trip_logged: record.trip_logged,
        })
    }

    async fn log_trip(&self, booking: &BookingMetadata, window: &RideWindow) -> Result<(), Error> {
        let outbound_meters = match booking.distance_meters {
            Some(meters) => meters,
            None => {
                self.bounded(self.maps.directions(
                    &booking.pickup_address,
                    &booking.dropoff_address,
                    false,
                ))
                .await
                .map_err(trip_log_failed_error)?
                .ok_or_else(|| trip_log_failed_error("no outbound route"))?
                .distance_meters
            }
        };

        let home = &self.config.booking.home_address;
        let return_meters = match self
            .bounded(self.maps.directions(&booking.dropoff_address, home, false))
            .await
        {
            Ok(Some(leg)) => Some(leg.distance_meters),
            Ok(None) => {
                tracing::warn!("no return route from {}", booking.dropoff_address);
                None
            }
            Err(err) => {
                tracing::warn!("return distance unavailable: {}", err);
                None
            }
        };

        let row = TripLogRow::new(
            window.start.local().format(LEDGER_TIME_FORMAT).to_string(),
            booking,
            outbound_meters,
            return_meters,
        );

        self.bounded(self.ledger.append(&row))
            .await
            .map_err(trip_log_failed_error)
    }
}

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self, booking))]
    async fn finalize(
        &self,
        booking: BookingMetadata,
        payment: PaymentRef,
    ) -> Result<FinalizationResult, Error> {
        if payment.session_id.trim().is_empty() {
            return Err(invalid_input_error("payment session id is required"));
        }

        booking.validate()?;
        check_paid_amount(&booking, &payment)?;

        // a booking time that cannot be resolved will not resolve on retry either
        let window = self.ride_window(&booking)?;

        let record = match self
            .finalizations
            .claim(
                FinalizationRecord::new(&payment.session_id),
                self.config.finalization_lease,
            )
            .await?
        {
            Claim::Acquired(record) => record,
            Claim::InProgress => {
                tracing::warn!("session {} is being finalized elsewhere", payment.session_id);
                return Err(finalization_in_progress_error());
            }
            Claim::AlreadyFinalized => {
                tracing::info!("session {} already finalized", payment.session_id);
                return Ok(FinalizationResult::AlreadyFinalized);
            }
        };

        match self
            .run_steps(record, &booking, window, PaymentMode::Online)
            .await
        {
            Ok(receipt) => Ok(FinalizationResult::Finalized(receipt)),
            Err(err) => {
                tracing::error!("finalization of {} failed: {}", payment.session_id, err);

                if let Err(release_err) = self.finalizations.release(&payment.session_id).await {
                    tracing::error!("could not release {}: {}", payment.session_id, release_err);
                }

                Err(err)
            }
        }
    }

    #[tracing::instrument(skip(self, booking))]
    async fn book_direct(&self, booking: BookingMetadata) -> Result<Receipt, Error> {
        booking.validate()?;

        if self.config.booking.enforce_zone_on_direct_booking {
            self.check_service_area(&booking.pickup_address, &booking.dropoff_address, true)
                .await?;
        }

        let window = self.ride_window(&booking)?;

        self.run_steps(
            FinalizationRecord::unpaid(),
            &booking,
            window,
            PaymentMode::OnBoard,
        )
        .await
    }
}
