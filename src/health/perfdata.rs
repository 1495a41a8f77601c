//! Performance data items in monitoring plugin format.
//!
//! Direct metrics render as `label=value[UOM];warn;crit;min;max`.
//! Derived metrics with range thresholds render as
//! `label=value;wmin:wmax;cmin:cmax`. Unset fields are left empty.
//! Textual values such as the node status render as plain `label=value`.

use std::fmt;

use super::threshold::{Bounds, RangeThreshold};

/// Unit of measurement suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uom {
    None,
    Percent,
    Counter,
}

impl Uom {
    pub fn suffix(&self) -> &'static str {
        match self {
            Uom::None => "",
            Uom::Percent => "%",
            Uom::Counter => "c",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Limits {
    Scalar {
        warning: Option<String>,
        critical: Option<String>,
        min: Option<String>,
        max: Option<String>,
    },
    Range {
        warning: Bounds,
        critical: Bounds,
    },
    Bare,
}

/// One performance data item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Perfdata {
    label: String,
    value: String,
    uom: Uom,
    limits: Limits,
}

impl Perfdata {
    /// A metric taken from the stats, without thresholds or bounds.
    pub fn metric(label: impl Into<String>, value: impl ToString, uom: Uom) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            uom,
            limits: Limits::Scalar {
                warning: None,
                critical: None,
                min: None,
                max: None,
            },
        }
    }

    /// A derived metric carrying range thresholds.
    pub fn derived(label: impl Into<String>, value: impl ToString, thresholds: &RangeThreshold) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            uom: Uom::None,
            limits: Limits::Range {
                warning: thresholds.warning,
                critical: thresholds.critical,
            },
        }
    }

    /// A textual value without thresholds or bounds.
    pub fn text(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            uom: Uom::None,
            limits: Limits::Bare,
        }
    }

    /// Set the warning and critical values of a direct metric.
    pub fn thresholds<W: ToString, C: ToString>(mut self, warning: Option<W>, critical: Option<C>) -> Self {
        if let Limits::Scalar {
            warning: w,
            critical: c,
            ..
        } = &mut self.limits
        {
            *w = warning.map(|v| v.to_string());
            *c = critical.map(|v| v.to_string());
        }
        self
    }

    /// Set the minimum and maximum values of a direct metric.
    pub fn bounds<L: ToString, H: ToString>(mut self, min: Option<L>, max: Option<H>) -> Self {
        if let Limits::Scalar {
            min: lo, max: hi, ..
        } = &mut self.limits
        {
            *lo = min.map(|v| v.to_string());
            *hi = max.map(|v| v.to_string());
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Perfdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}{}", self.label, self.value, self.uom.suffix())?;
        match &self.limits {
            Limits::Scalar {
                warning,
                critical,
                min,
                max,
            } => {
                let field = |v: &Option<String>| v.clone().unwrap_or_default();
                write!(
                    f,
                    ";{};{};{};{}",
                    field(warning),
                    field(critical),
                    field(min),
                    field(max)
                )
            }
            Limits::Range { warning, critical } => write!(f, ";{};{}", warning, critical),
            Limits::Bare => Ok(()),
        }
    }
}

/// Ordered list of performance data items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfdataList {
    items: Vec<Perfdata>,
}

impl PerfdataList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Perfdata) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Perfdata> {
        self.items.iter()
    }

    /// Find an item by label.
    pub fn get(&self, label: &str) -> Option<&Perfdata> {
        self.items.iter().find(|item| item.label == label)
    }
}

impl fmt::Display for PerfdataList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_metric() {
        let item = Perfdata::metric("jvm.mem.heap_used_percent", 12, Uom::Percent)
            .thresholds(Some(70), Some(80))
            .bounds(Some(0), Some(100));
        assert_eq!(item.to_string(), "jvm.mem.heap_used_percent=12%;70;80;0;100");
    }

    #[test]
    fn test_text_item() {
        let item = Perfdata::text("status", "green").thresholds(Some(1), Some(2));
        assert_eq!(item.to_string(), "status=green");
        assert_eq!(item.value(), "green");
    }

    #[test]
    fn test_counter_metric() {
        let item = Perfdata::metric("pipelines.main.events.in", 500, Uom::Counter)
            .bounds(Some(0), None::<i64>);
        assert_eq!(item.to_string(), "pipelines.main.events.in=500c;;;0;");
    }

    #[test]
    fn test_unset_fields_are_empty() {
        let item = Perfdata::metric("process.cpu.percent", 5, Uom::Percent)
            .thresholds(None::<i64>, None::<i64>)
            .bounds(Some(0), Some(100));
        assert_eq!(item.to_string(), "process.cpu.percent=5%;;;0;100");
    }

    #[test]
    fn test_derived_metric() {
        let t = RangeThreshold::new(Bounds::new(Some(5), Some(10)), Bounds::new(None, Some(20)));
        let item = Perfdata::derived("inflight_events_main", 3, &t);
        assert_eq!(item.to_string(), "inflight_events_main=3;5:10;20");

        let none = Perfdata::derived("inflight_events", -2, &RangeThreshold::default());
        assert_eq!(none.to_string(), "inflight_events=-2;;");
    }

    #[test]
    fn test_list_joins_with_spaces() {
        let mut list = PerfdataList::new();
        assert_eq!(list.to_string(), "");

        list.push(Perfdata::metric("a", 1, Uom::None));
        list.push(Perfdata::metric("b", 2, Uom::Counter));
        assert_eq!(list.to_string(), "a=1;;;; b=2c;;;;");
        assert_eq!(list.len(), 2);
        assert_eq!(list.get("b").unwrap().value(), "2");
    }
}
