//! Builders for vehicles and dealership configs.

#![allow(dead_code)]

use silverfox::config::OutputRules;
use silverfox::{DealershipConfig, FilterRules, Vehicle, VehicleType};

/// Builder for `Vehicle` records as a scraper would emit them.
pub struct VehicleBuilder {
    vehicle: Vehicle,
}

impl VehicleBuilder {
    /// A used vehicle at `location` with stock number, price and listing URL.
    pub fn new(vin: &str, location: &str) -> Self {
        Self {
            vehicle: Vehicle {
                vin: vin.to_string(),
                stock: Some(format!("STK-{}", vin)),
                vehicle_type: Some("Used".to_string()),
                year: Some(2022),
                make: Some("Honda".to_string()),
                model: Some("Civic".to_string()),
                status: Some("In Stock".to_string()),
                price: Some(21500.0),
                location: location.to_string(),
                vehicle_url: Some(format!("https://dealer.example.com/vdp/{}", vin)),
                ..Default::default()
            },
        }
    }

    pub fn vehicle_type(mut self, value: &str) -> Self {
        self.vehicle.vehicle_type = Some(value.to_string());
        self
    }

    pub fn status(mut self, value: &str) -> Self {
        self.vehicle.status = Some(value.to_string());
        self
    }

    pub fn no_stock(mut self) -> Self {
        self.vehicle.stock = None;
        self
    }

    pub fn no_price(mut self) -> Self {
        self.vehicle.price = None;
        self
    }

    pub fn no_url(mut self) -> Self {
        self.vehicle.vehicle_url = None;
        self
    }

    pub fn build(self) -> Vehicle {
        self.vehicle
    }
}

/// Builder for `DealershipConfig`.
pub struct DealershipBuilder {
    config: DealershipConfig,
}

impl DealershipBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            config: DealershipConfig::fallback(name),
        }
    }

    pub fn location(mut self, location: &str) -> Self {
        self.config.location = Some(location.to_string());
        self
    }

    pub fn vehicle_types(mut self, types: &[VehicleType]) -> Self {
        self.config.filtering_rules.vehicle_types = types.to_vec();
        self
    }

    pub fn exclude_missing_stock(mut self) -> Self {
        self.config.filtering_rules.exclude_missing_stock = true;
        self
    }

    pub fn exclude_missing_price(mut self) -> Self {
        self.config.filtering_rules.exclude_missing_price = true;
        self
    }

    pub fn exclude_status(mut self, statuses: &[&str]) -> Self {
        self.config.filtering_rules.exclude_status =
            statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn filtering_rules(mut self, rules: FilterRules) -> Self {
        self.config.filtering_rules = rules;
        self
    }

    pub fn without_qr(mut self) -> Self {
        self.config.output_rules = OutputRules { generate_qr: false };
        self
    }

    pub fn qr_output_path(mut self, path: &str) -> Self {
        self.config.qr_output_path = Some(path.to_string());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.config.active = false;
        self
    }

    pub fn build(self) -> DealershipConfig {
        self.config
    }
}
