//! Association resolution between rental properties and tenants.
//!
//! The tenant's `rented_properties` set is the authoritative record. The
//! resolver derives pairings from it without touching storage; the service
//! layer decides what to do with the derived repair list.

use crate::rentals::domain::{
    LeaseStatus, ListingType, Property, PropertyId, PropertyStatus, Tenant, TenantId, TenantStatus,
};
use crate::rentals::store::{PropertyPatch, TenantPatch};
use serde::Serialize;
use std::collections::BTreeSet;

/// One resolved (property, tenant) rental pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RentalPairing {
    pub property_id: PropertyId,
    pub tenant_id: TenantId,
}

/// Output of one resolution pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssociationSet {
    /// Deduplicated pairings, in property-then-tenant order.
    pub pairs: Vec<RentalPairing>,
    /// Properties considered rented: at least one pairing, or the stored
    /// `rented` flag set by hand before pairings existed.
    pub rented_properties: Vec<PropertyId>,
    /// Paired properties whose stored status disagrees and needs the
    /// `rented` repair write.
    pub repairs: Vec<PropertyId>,
}

/// Pure resolution over in-memory snapshots of both collections. Empty
/// inputs produce an empty set; sale listings are ignored entirely.
pub fn resolve_associations(properties: &[Property], tenants: &[Tenant]) -> AssociationSet {
    let mut set = AssociationSet::default();
    let mut seen: BTreeSet<(PropertyId, TenantId)> = BTreeSet::new();

    for property in properties {
        if property.listing_type != ListingType::Rental {
            continue;
        }
        let mut paired = false;
        for tenant in tenants {
            if !tenant.rented_properties.contains(&property.id) {
                continue;
            }
            paired = true;
            if seen.insert((property.id.clone(), tenant.id.clone())) {
                set.pairs.push(RentalPairing {
                    property_id: property.id.clone(),
                    tenant_id: tenant.id.clone(),
                });
            }
        }
        if paired || property.status == PropertyStatus::Rented {
            set.rented_properties.push(property.id.clone());
        }
        if paired && property.status != PropertyStatus::Rented {
            set.repairs.push(property.id.clone());
        }
    }

    set.pairs
        .sort_by(|a, b| (&a.property_id, &a.tenant_id).cmp(&(&b.property_id, &b.tenant_id)));
    set
}

/// Document updates that attach a tenant to a property. The tenant side
/// carries the association; the property side is the back-reference plus the
/// occupancy flag.
pub(crate) fn link_patches(property: &Property, tenant: &Tenant) -> (PropertyPatch, TenantPatch) {
    let mut rented_properties = tenant.rented_properties.clone();
    rented_properties.insert(property.id.clone());
    let mut rented_to = property.rented_to.clone();
    rented_to.insert(tenant.id.clone());

    let property_patch = PropertyPatch {
        status: Some(PropertyStatus::Rented),
        rented_to: Some(rented_to),
    };
    let tenant_patch = TenantPatch {
        rented_properties: Some(rented_properties),
        status: Some(TenantStatus::Active),
        lease_status: Some(LeaseStatus::Active),
    };
    (property_patch, tenant_patch)
}

/// Document updates that detach a tenant from a property. A tenant left with
/// no rentals drops back to a pending lease; their account status and the
/// property's occupancy flag are left for staff to manage.
pub(crate) fn unlink_patches(property: &Property, tenant: &Tenant) -> (PropertyPatch, TenantPatch) {
    let mut rented_properties = tenant.rented_properties.clone();
    rented_properties.remove(&property.id);
    let mut rented_to = property.rented_to.clone();
    rented_to.remove(&tenant.id);

    let lease_status = if rented_properties.is_empty() {
        Some(LeaseStatus::Pending)
    } else {
        None
    };
    let property_patch = PropertyPatch {
        status: None,
        rented_to: Some(rented_to),
    };
    let tenant_patch = TenantPatch {
        rented_properties: Some(rented_properties),
        status: None,
        lease_status,
    };
    (property_patch, tenant_patch)
}
