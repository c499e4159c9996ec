//! Phase-indexed compliance schedule.

use std::collections::BTreeMap;

use crate::error::InsertionError;
use crate::phase::Phase;

/// Per-axis values: translational x, y, z then rotational x, y, z.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes6 {
    pub translational: [f64; 3],
    pub rotational: [f64; 3],
}

impl Axes6 {
    pub const fn new(translational: [f64; 3], rotational: [f64; 3]) -> Self {
        Self {
            translational,
            rotational,
        }
    }

    pub const fn from_array(v: [f64; 6]) -> Self {
        Self {
            translational: [v[0], v[1], v[2]],
            rotational: [v[3], v[4], v[5]],
        }
    }

    pub const fn to_array(self) -> [f64; 6] {
        let [tx, ty, tz] = self.translational;
        let [rx, ry, rz] = self.rotational;
        [tx, ty, tz, rx, ry, rz]
    }

    fn all_valid(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Stiffness and damping pushed to the impedance controller. 0 frees an axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImpedanceParameters {
    pub stiffness: Axes6,
    pub damping: Axes6,
}

impl ImpedanceParameters {
    pub const fn new(stiffness: Axes6, damping: Axes6) -> Self {
        Self { stiffness, damping }
    }

    pub fn validate(&self) -> Result<(), InsertionError> {
        if !self.stiffness.all_valid() {
            return Err(InsertionError::InvalidParameter(
                "stiffness components must be finite and >= 0".into(),
            ));
        }
        if !self.damping.all_valid() {
            return Err(InsertionError::InvalidParameter(
                "damping components must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }
}

/// Lookup from phase to compliance, fixed at configuration time.
#[derive(Debug, Clone)]
pub struct ImpedanceSchedule {
    default: ImpedanceParameters,
    table: BTreeMap<Phase, ImpedanceParameters>,
}

impl ImpedanceSchedule {
    /// Every motion phase must have an entry. Entries for `Start`, `Finish`
    /// and `Idle` are ignored; those phases always use `default`.
    pub fn new(
        default: ImpedanceParameters,
        table: impl IntoIterator<Item = (Phase, ImpedanceParameters)>,
    ) -> Result<Self, InsertionError> {
        default.validate()?;
        let mut map = BTreeMap::new();
        for (phase, params) in table {
            params.validate()?;
            if phase.is_motion() {
                map.insert(phase, params);
            }
        }
        if let Some(missing) = Phase::MOTION.into_iter().find(|p| !map.contains_key(p)) {
            return Err(InsertionError::MissingConfiguration(missing));
        }
        Ok(Self {
            default,
            table: map,
        })
    }

    /// Same parameters for every phase.
    #[cfg(test)]
    pub(crate) fn uniform(params: ImpedanceParameters) -> Result<Self, InsertionError> {
        Self::new(params, Phase::MOTION.map(|p| (p, params)))
    }

    pub fn parameters_for(&self, phase: Phase) -> Result<ImpedanceParameters, InsertionError> {
        if !phase.is_motion() {
            return Ok(self.default);
        }
        self.table
            .get(&phase)
            .copied()
            .ok_or(InsertionError::MissingConfiguration(phase))
    }

    pub fn default_parameters(&self) -> ImpedanceParameters {
        self.default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: f64) -> ImpedanceParameters {
        ImpedanceParameters::new(
            Axes6::new([k, k, k], [30.0; 3]),
            Axes6::new([2.0 * k.sqrt(); 3], [10.0; 3]),
        )
    }

    #[test]
    fn non_motion_phases_use_default() {
        let s = ImpedanceSchedule::new(
            params(1000.0),
            Phase::MOTION.map(|p| (p, params(200.0 + p.index() as f64))),
        )
        .unwrap();
        for p in [Phase::Start, Phase::Finish, Phase::Idle] {
            assert_eq!(s.parameters_for(p).unwrap(), params(1000.0));
        }
        assert_eq!(
            s.parameters_for(Phase::SpiralMotion).unwrap(),
            params(200.0 + Phase::SpiralMotion.index() as f64)
        );
    }

    #[test]
    fn missing_motion_phase_is_reported() {
        let table = Phase::MOTION
            .into_iter()
            .filter(|p| *p != Phase::InsertionWiggle)
            .map(|p| (p, params(500.0)));
        match ImpedanceSchedule::new(params(1000.0), table) {
            Err(InsertionError::MissingConfiguration(p)) => assert_eq!(p, Phase::InsertionWiggle),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn negative_or_nan_components_rejected() {
        let mut bad = params(100.0);
        bad.stiffness.translational[2] = -1.0;
        assert!(matches!(
            bad.validate(),
            Err(InsertionError::InvalidParameter(_))
        ));
        bad.stiffness.translational[2] = 0.0;
        bad.damping.rotational[0] = f64::NAN;
        assert!(ImpedanceSchedule::uniform(bad).is_err());
    }

    #[test]
    fn axes_array_order_is_translation_first() {
        let a = Axes6::from_array([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.translational, [1.0, 2.0, 3.0]);
        assert_eq!(a.rotational, [4.0, 5.0, 6.0]);
        assert_eq!(a.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
