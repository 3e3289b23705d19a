//! Throughput reservations (regional)

use super::models::Reservation;
use crate::gcp::client::{with_query, GcpClient};
use crate::gcp::pager::{list_all, list_all_as};
use anyhow::{Context, Result};
use std::io::Write;

fn reservations_parent(project_id: &str, region: &str) -> String {
    format!("projects/{}/locations/{}/reservations", project_id, region)
}

pub(crate) fn reservation_path(project_id: &str, region: &str, reservation_id: &str) -> String {
    format!("{}/{}", reservations_parent(project_id, region), reservation_id)
}

/// Create a reservation of `capacity` throughput units
pub async fn create_reservation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    reservation_id: &str,
    capacity: i64,
) -> Result<Reservation> {
    let url = with_query(
        &client.pubsublite_url(region, &reservations_parent(project_id, region)),
        &[("reservationId", reservation_id)],
    )?;
    let body = serde_json::to_value(Reservation {
        throughput_capacity: capacity,
        ..Default::default()
    })?;
    let res: Reservation = client
        .post_as(&url, Some(&body))
        .await
        .context("client.CreateReservation")?;

    writeln!(w, "Created reservation: {}", res.name)?;
    Ok(res)
}

pub async fn get_reservation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    reservation_id: &str,
) -> Result<Reservation> {
    let url = client.pubsublite_url(region, &reservation_path(project_id, region, reservation_id));
    let res: Reservation = client.get_as(&url).await.context("client.Reservation")?;

    writeln!(w, "Got reservation: {:?}", res)?;
    Ok(res)
}

pub async fn list_reservations(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
) -> Result<Vec<Reservation>> {
    let url = client.pubsublite_url(region, &reservations_parent(project_id, region));
    let reservations: Vec<Reservation> = list_all_as(client, &url, "reservations")
        .await
        .context("client.Reservations")?;

    for res in &reservations {
        writeln!(w, "Got reservation: {:?}", res)?;
    }
    Ok(reservations)
}

/// Change the throughput capacity of a reservation
pub async fn update_reservation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    reservation_id: &str,
    capacity: i64,
) -> Result<Reservation> {
    let name = reservation_path(project_id, region, reservation_id);
    let url = with_query(
        &client.pubsublite_url(region, &name),
        &[("updateMask", "throughputCapacity")],
    )?;
    let body = serde_json::to_value(Reservation {
        name,
        throughput_capacity: capacity,
    })?;
    let res: Reservation = client
        .patch_as(&url, &body)
        .await
        .context("client.UpdateReservation")?;

    writeln!(w, "Updated reservation: {:?}", res)?;
    Ok(res)
}

pub async fn delete_reservation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    reservation_id: &str,
) -> Result<()> {
    let url = client.pubsublite_url(region, &reservation_path(project_id, region, reservation_id));
    client.delete(&url).await.context("client.DeleteReservation")?;

    writeln!(w, "Deleted reservation")?;
    Ok(())
}

/// Names of the topics using a reservation
pub async fn list_topics_in_reservation(
    w: &mut dyn Write,
    client: &GcpClient,
    project_id: &str,
    region: &str,
    reservation_id: &str,
) -> Result<Vec<String>> {
    let url = client.pubsublite_url(
        region,
        &format!("{}/topics", reservation_path(project_id, region, reservation_id)),
    );
    let names: Vec<String> = list_all(client, &url, "topics")
        .await
        .context("client.ReservationTopics")?
        .into_iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();

    for name in &names {
        writeln!(w, "Got topic: {}", name)?;
    }
    Ok(names)
}
