use chrono::NaiveDate;

use super::{Priority, Request, Status};

/// The filter state of the request list.
///
/// The default value matches every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    /// Case-insensitive text searched in the title, description, assignee and
    /// requester. Empty matches everything.
    pub search: String,
    /// Only this status. `None` means all statuses.
    pub status: Option<Status>,
    /// Only this priority. `None` means all priorities.
    pub priority: Option<Priority>,
    /// Earliest reception date, inclusive.
    pub from: Option<NaiveDate>,
    /// Latest reception date, inclusive.
    pub to: Option<NaiveDate>,
}

impl FilterParams {
    /// Whether `request` passes every criterion.
    #[must_use]
    pub fn matches(&self, request: &Request) -> bool {
        self.matches_lowered(request, &self.search.to_lowercase())
    }

    fn matches_lowered(&self, request: &Request, needle: &str) -> bool {
        self.matches_search(request, needle)
            && self.status.is_none_or(|status| request.status == status)
            && self.priority.is_none_or(|priority| request.priority == priority)
            && self.from.is_none_or(|from| request.received >= from)
            && self.to.is_none_or(|to| request.received <= to)
    }

    fn matches_search(&self, request: &Request, needle: &str) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

        contains(request.title.as_str())
            || contains(request.description.as_str())
            || request.assignee().is_some_and(contains)
            || contains(request.requester.as_str())
    }
}

/// The requests matching `params`, in their original order.
#[must_use]
pub fn filter<'a>(requests: &'a [Request], params: &FilterParams) -> Vec<&'a Request> {
    let needle = params.search.to_lowercase();
    requests
        .iter()
        .filter(|request| params.matches_lowered(request, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use test_case::test_case;

    use super::*;
    use crate::domain::{NewRequest, RequestId};

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn request(title: &str, received: &str, status: Status, priority: Priority) -> Request {
        let draft = NewRequest {
            title: title.to_string(),
            description: format!("Details about {title}"),
            requester: "Support desk".to_string(),
            status,
            priority,
            ..NewRequest::new(day(received))
        }
        .validate()
        .unwrap();
        Request::from_draft(RequestId::generate(), draft, Utc::now(), None)
    }

    fn sample() -> Vec<Request> {
        let mut assigned = request(
            "Laptop replacement",
            "2024-02-01",
            Status::InProgress,
            Priority::High,
        );
        assigned.assignee = Some("Karim".to_string());
        vec![
            request("Printer jam", "2024-01-05", Status::Pending, Priority::Low),
            assigned,
            request("VPN access", "2024-02-15", Status::Closed, Priority::Urgent),
            request("New monitor", "2024-03-01", Status::Pending, Priority::High),
        ]
    }

    fn titles(requests: &[&Request]) -> Vec<String> {
        requests.iter().map(|r| r.title.to_string()).collect()
    }

    #[test]
    fn default_params_keep_everything_in_order() {
        let requests = sample();
        let filtered = filter(&requests, &FilterParams::default());
        assert_eq!(
            titles(&filtered),
            ["Printer jam", "Laptop replacement", "VPN access", "New monitor"]
        );
    }

    #[test_case("printer", &["Printer jam"]; "title, case-insensitive")]
    #[test_case("KARIM", &["Laptop replacement"]; "assignee")]
    #[test_case("about vpn", &["VPN access"]; "description")]
    #[test_case("support desk", &["Printer jam", "Laptop replacement", "VPN access", "New monitor"]; "requester")]
    #[test_case("nothing like this", &[]; "no match")]
    fn search(term: &str, expected: &[&str]) {
        let requests = sample();
        let params = FilterParams {
            search: term.to_string(),
            ..FilterParams::default()
        };
        assert_eq!(titles(&filter(&requests, &params)), expected);
    }

    #[test]
    fn status_and_priority_must_both_match() {
        let requests = sample();
        let params = FilterParams {
            status: Some(Status::Pending),
            priority: Some(Priority::High),
            ..FilterParams::default()
        };
        assert_eq!(titles(&filter(&requests, &params)), ["New monitor"]);
    }

    #[test_case(Some("2024-02-01"), Some("2024-02-15"), &["Laptop replacement", "VPN access"]; "both bounds inclusive")]
    #[test_case(Some("2024-02-10"), None, &["VPN access", "New monitor"]; "lower bound only")]
    #[test_case(None, Some("2024-01-31"), &["Printer jam"]; "upper bound only")]
    fn date_range(from: Option<&str>, to: Option<&str>, expected: &[&str]) {
        let requests = sample();
        let params = FilterParams {
            from: from.map(day),
            to: to.map(day),
            ..FilterParams::default()
        };
        assert_eq!(titles(&filter(&requests, &params)), expected);
    }

    #[test]
    fn matches_agrees_with_filter() {
        let requests = sample();
        let params = FilterParams {
            search: "a".to_string(),
            priority: Some(Priority::High),
            ..FilterParams::default()
        };
        let expected: Vec<_> = requests.iter().filter(|r| params.matches(r)).collect();
        assert_eq!(filter(&requests, &params), expected);
    }
}
