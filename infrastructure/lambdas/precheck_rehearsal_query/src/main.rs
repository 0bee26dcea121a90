use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use probenplan_libs::{AvailabilityRecord, RehearsalQuery, ValidationError};

use serde::{Deserialize, Serialize};

/// Checks a request before any availability is loaded or searched
#[derive(Deserialize)]
struct Request {
    query: RehearsalQuery,
    #[serde(default)]
    availability: Vec<AvailabilityRecord>,
}

#[derive(Serialize, Debug, PartialEq)]
struct Response {
    success: bool,
    error: Option<String>,
}

fn precheck(request: &Request) -> Result<(), ValidationError> {
    request.query.validate_request()?;
    request
        .availability
        .iter()
        .try_for_each(AvailabilityRecord::validate)
}

async fn function_handler(event: LambdaEvent<Request>) -> Result<Response, Error> {
    Ok(match precheck(&event.payload) {
        Ok(_) => Response {
            success: true,
            error: None,
        },
        Err(err) => Response {
            success: false,
            error: Some(err.to_string()),
        },
    })
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

    run(service_fn(function_handler)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_backwards_window() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": {
                "startDate": "2024-03-10", "endDate": "2024-03-04", "durationMinutes": 60
            }
        }))
        .unwrap();

        assert!(matches!(
            precheck(&request),
            Err(ValidationError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn rejects_malformed_availability() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": {
                "startDate": "2024-03-04", "endDate": "2024-03-10", "durationMinutes": 60
            },
            "availability": [
                { "memberId": "ana", "type": "recurring", "dayOfWeek": 9,
                  "startTime": "19:00:00", "endTime": "21:00:00", "effectiveDate": "2024-01-01" }
            ]
        }))
        .unwrap();

        assert_eq!(
            precheck(&request),
            Err(ValidationError::InvalidDayOfWeek {
                member: "ana".to_string(),
                day: 9
            })
        );
    }
}
