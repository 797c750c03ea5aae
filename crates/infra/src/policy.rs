//! ARN-scoped Route53 access policy document.

use serde_json::{Value as JsonValue, json};

/// Policy version understood by the identity provider.
const POLICY_VERSION: &str = "2012-10-17";

/// ARN of a hosted zone, as referenced from policy resources.
pub fn hosted_zone_arn(zone_id: &str) -> String {
    format!("arn:aws:route53:::hostedzone/{zone_id}")
}

/// Build the least-privilege policy document for one hosted zone: record
/// mutation is allowed only on that zone, while the read-only listing
/// actions stay global.
pub fn route53_zone_policy(zone_id: &str) -> JsonValue {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [
            {
                "Effect": "Allow",
                "Action": "route53:ChangeResourceRecordSets",
                "Resource": hosted_zone_arn(zone_id),
            },
            {
                "Effect": "Allow",
                "Action": [
                    "route53:ListHostedZones",
                    "route53:ListResourceRecordSets",
                ],
                "Resource": "*",
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_is_scoped_to_the_zone() {
        let doc = route53_zone_policy("testhostedzone1");
        let statements = doc["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 2);

        assert_eq!(
            statements[0]["Action"],
            "route53:ChangeResourceRecordSets"
        );
        assert_eq!(
            statements[0]["Resource"],
            "arn:aws:route53:::hostedzone/testhostedzone1"
        );
    }

    #[test]
    fn listing_stays_global() {
        let doc = route53_zone_policy("z");
        let listing = &doc["Statement"][1];
        assert_eq!(listing["Resource"], "*");
        let actions = listing["Action"].as_array().unwrap();
        assert!(actions.contains(&json!("route53:ListHostedZones")));
        assert!(actions.contains(&json!("route53:ListResourceRecordSets")));
    }
}
