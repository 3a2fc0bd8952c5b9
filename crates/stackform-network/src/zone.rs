//! Availability zones and the subnet plan derived from them.

use stackform_core::{Cidr, SynthError, SynthResult, Visibility};

use crate::allocator::CidrAllocator;

/// An availability zone and its position in the configured list.
///
/// The ordinal fixes the zone's address blocks and is never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Zone {
    name: String,
    ordinal: usize,
}

impl Zone {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Zones in configuration order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Vec<Zone> {
        names
            .iter()
            .enumerate()
            .map(|(ordinal, name)| Zone {
                name: name.as_ref().to_string(),
                ordinal,
            })
            .collect()
    }
}

/// Where one subnet goes and which block it gets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    pub zone: Zone,
    pub visibility: Visibility,
    pub cidr_block: Cidr,
    /// Allocator index: `pass × zone_count + ordinal + 1`.
    pub index: i64,
}

/// Allocator index for a subnet. Private subnets take pass 0 and public
/// subnets pass 1, so the two ranges never meet for any zone count.
pub fn subnet_index(visibility: Visibility, zone_count: usize, ordinal: usize) -> i64 {
    i64::from(visibility.pass()) * zone_count as i64 + ordinal as i64 + 1
}

/// Plan every subnet: all private subnets in zone order, then all public.
pub fn plan_subnets(zones: &[Zone], allocator: &CidrAllocator) -> SynthResult<Vec<SubnetPlan>> {
    let mut plans = Vec::with_capacity(zones.len() * 2);
    for visibility in [Visibility::Private, Visibility::Public] {
        for zone in zones {
            let index = subnet_index(visibility, zones.len(), zone.ordinal);
            let cidr_block = allocator.allocate(index).map_err(|err| match err {
                SynthError::InvalidAllocation { index, reason } => SynthError::InvalidAllocation {
                    index,
                    reason: format!(
                        "{} subnet for zone {} (ordinal {}): {reason}",
                        visibility.as_str(),
                        zone.name,
                        zone.ordinal
                    ),
                },
                other => other,
            })?;
            plans.push(SubnetPlan {
                zone: zone.clone(),
                visibility,
                cidr_block,
                index,
            });
        }
    }
    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator() -> CidrAllocator {
        CidrAllocator::new("10.0.0.0/16".parse().unwrap(), 24).unwrap()
    }

    #[test]
    fn ordinals_follow_configuration() {
        let zones = Zone::from_names(&["us-east-1f", "us-east-1a"]);
        assert_eq!(zones[0].name(), "us-east-1f");
        assert_eq!(zones[0].ordinal(), 0);
        assert_eq!(zones[1].ordinal(), 1);
    }

    #[test]
    fn three_zone_plan() {
        let zones = Zone::from_names(&["us-east-1a", "us-east-1b", "us-east-1f"]);
        let plans = plan_subnets(&zones, &allocator()).unwrap();
        let blocks: Vec<String> = plans.iter().map(|p| p.cidr_block.to_string()).collect();
        assert_eq!(
            blocks,
            vec![
                "10.0.1.0/24",
                "10.0.2.0/24",
                "10.0.3.0/24",
                "10.0.4.0/24",
                "10.0.5.0/24",
                "10.0.6.0/24",
            ]
        );
        assert!(plans[..3].iter().all(|p| p.visibility == Visibility::Private));
        assert_eq!(plans[4].zone.name(), "us-east-1b");
        assert_eq!(plans[4].index, 5);
    }

    #[test]
    fn no_shared_blocks_for_any_zone_count() {
        for count in 1..=20 {
            let names: Vec<String> = (0..count).map(|i| format!("zone-{i}")).collect();
            let plans = plan_subnets(&Zone::from_names(&names), &allocator()).unwrap();
            assert_eq!(plans.len(), 2 * count);
            for (i, a) in plans.iter().enumerate() {
                for b in &plans[i + 1..] {
                    assert!(!a.cidr_block.overlaps(&b.cidr_block));
                }
            }
        }
    }

    #[test]
    fn plan_fails_when_range_exhausted() {
        let small = CidrAllocator::new("10.0.0.0/23".parse().unwrap(), 24).unwrap();
        let zones = Zone::from_names(&["a", "b"]);
        assert!(plan_subnets(&zones, &small).is_err());
    }

    #[test]
    fn exhausted_range_names_the_zone() {
        let small = CidrAllocator::new("10.0.0.0/22".parse().unwrap(), 24).unwrap();
        let zones = Zone::from_names(&["us-east-1a", "us-east-1b"]);
        match plan_subnets(&zones, &small) {
            Err(SynthError::InvalidAllocation { index, reason }) => {
                assert_eq!(index, 4);
                assert!(reason.starts_with("public subnet for zone us-east-1b (ordinal 1)"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("four blocks planned in a range holding three"),
        }
    }
}
