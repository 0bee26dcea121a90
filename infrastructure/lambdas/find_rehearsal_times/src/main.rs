use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use probenplan_libs::{
    group_by_member, AvailabilityRecord, CandidateSlot, Member, RehearsalQuery, SlotFinder,
};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

/// Everything the finder needs, loaded by the caller from the band's records
#[derive(Deserialize)]
struct Request {
    roster: Vec<Member>,
    #[serde(default)]
    availability: Vec<AvailabilityRecord>,
    query: RehearsalQuery,
}

#[derive(Serialize, Debug)]
struct Response {
    results: Vec<CandidateSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Reads the finder configuration from the environment.
/// `TOP_K` bounds the number of slots returned.
fn slot_finder() -> SlotFinder {
    let top_k = env::var("TOP_K")
        .map(|e| e.parse::<usize>().ok())
        .ok()
        .flatten();

    match top_k {
        Some(top_k) => SlotFinder::new().with_top_k(top_k),
        None => SlotFinder::new(),
    }
}

fn find(request: Request, finder: SlotFinder) -> Response {
    let Request {
        roster,
        availability,
        query,
    } = request;

    let found = query.validate_request().and_then(|_| {
        finder.find(&roster, &group_by_member(availability), &query)
    });

    match found {
        Ok(results) => {
            info!(
                band = query.band_id.as_str(),
                slots = results.len(),
                "found rehearsal slots"
            );
            Response {
                results,
                error: None,
            }
        }
        Err(err) => {
            warn!(band = query.band_id.as_str(), "rejected request: {}", err);
            Response {
                results: vec![],
                error: Some(err.to_string()),
            }
        }
    }
}

async fn function_handler(
    event: LambdaEvent<Request>,
    finder: SlotFinder,
) -> Result<Response, Error> {
    Ok(find(event.payload, finder))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        // disable printing the name of the module in every log line.
        .with_target(false)
        // disabling time is handy because CloudWatch will add the ingestion time.
        .without_time()
        .init();

    let finder = slot_finder();
    info!(top_k = finder.top_k(), "starting rehearsal finder");

    run(service_fn(move |event| function_handler(event, finder))).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration: u32) -> Request {
        serde_json::from_value(serde_json::json!({
            "roster": [
                { "id": "ana", "name": "Ana" },
                { "id": "ben", "name": "Ben" }
            ],
            "availability": [
                { "memberId": "ana", "type": "recurring", "dayOfWeek": 2,
                  "startTime": "19:00:00", "endTime": "21:00:00", "effectiveDate": "2024-01-01" },
                { "memberId": "ben", "type": "oneTime",
                  "start": "2024-03-05T19:30:00", "end": "2024-03-05T20:30:00" }
            ],
            "query": {
                "bandId": "band", "startDate": "2024-03-04", "endDate": "2024-03-10",
                "durationMinutes": duration, "minimumMembers": 2
            }
        }))
        .unwrap()
    }

    #[test]
    fn finds_shared_slot() {
        let response = find(request(30), SlotFinder::new());

        assert_eq!(response.error, None);
        assert_eq!(response.results.len(), 1);
        assert_eq!(
            response.results[0].start.to_string(),
            "2024-03-05 19:30:00"
        );
    }

    #[test]
    fn reports_invalid_requests() {
        let response = find(request(15), SlotFinder::new());

        assert!(response.results.is_empty());
        assert_eq!(
            response.error.as_deref(),
            Some("Rehearsal duration must be between 30 and 480 minutes, got 15")
        );
    }
}
