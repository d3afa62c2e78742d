use district_health::{GroupBy, GroupKey, RankEntry, RankMetric};

/// Lays out a ranking as CSV text, header included. The key columns depend
/// on the grouping; the value column carries the metric name.
pub fn render_ranking(ranking: &[RankEntry], group_by: GroupBy, metric: RankMetric) -> String {
    let header = match group_by {
        GroupBy::State => "state",
        GroupBy::StateDistrict => "state,district",
        GroupBy::Pincode => "pincode",
    };
    let mut out = String::new();
    out.push_str(header);
    out.push(',');
    out.push_str(metric.as_str());
    out.push('\n');
    for entry in ranking {
        match &entry.key {
            GroupKey::State(state) => {
                out.push_str(&escape_field(state));
            }
            GroupKey::StateDistrict(state, district) => {
                out.push_str(&escape_field(state));
                out.push(',');
                out.push_str(&escape_field(district));
            }
            GroupKey::Pincode(pincode) => {
                out.push_str(&pincode.to_string());
            }
        }
        out.push(',');
        out.push_str(&format!("{:.2}", entry.mean));
        out.push('\n');
    }
    out
}

fn escape_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_the_three_groupings() {
        let by_state = vec![
            RankEntry {
                key: GroupKey::State("Odisha".to_string()),
                mean: 78.214,
            },
            RankEntry {
                key: GroupKey::State("Kerala".to_string()),
                mean: 64.0,
            },
        ];
        assert_eq!(
            render_ranking(&by_state, GroupBy::State, RankMetric::HealthScore),
            "state,health_score\nOdisha,78.21\nKerala,64.00\n"
        );

        let by_district = vec![RankEntry {
            key: GroupKey::StateDistrict("Odisha".to_string(), "Puri".to_string()),
            mean: 0.5,
        }];
        assert_eq!(
            render_ranking(
                &by_district,
                GroupBy::StateDistrict,
                RankMetric::SaturationRatio
            ),
            "state,district,saturation_ratio\nOdisha,Puri,0.50\n"
        );

        let by_pincode = vec![RankEntry {
            key: GroupKey::Pincode(752001),
            mean: 0.75,
        }];
        assert_eq!(
            render_ranking(&by_pincode, GroupBy::Pincode, RankMetric::LateAdopterRatio),
            "pincode,late_adopter_ratio\n752001,0.75\n"
        );
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(escape_field("Puri"), "Puri");
        assert_eq!(escape_field("Puri, East"), "\"Puri, East\"");
    }
}
