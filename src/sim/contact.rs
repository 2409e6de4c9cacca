//! Per-pair contact coefficients fed into the solver.
//!
//! Every collider carries its [`MaterialId`] in `user_data` and asks for
//! solver-contact modification. The hook looks the pair up in the registry on
//! every narrow-phase pass, so an edited record takes effect on the next step.

use rapier3d_f64::prelude::{Collider, ContactModificationContext, PhysicsHooks};

use super::{MaterialId, MaterialRegistry};

pub(crate) struct ContactHooks<'a> {
    pub materials: &'a MaterialRegistry,
}

impl PhysicsHooks for ContactHooks<'_> {
    fn modify_solver_contacts(&self, context: &mut ContactModificationContext) {
        let (Some(a), Some(b)) = (
            context.colliders.get(context.collider1).map(material_of),
            context.colliders.get(context.collider2).map(material_of),
        ) else {
            return;
        };
        let coefficients = self.materials.coefficients_for(a, b);
        for contact in context.solver_contacts.iter_mut() {
            contact.friction = coefficients.friction;
            contact.restitution = coefficients.restitution;
        }
    }
}

fn material_of(collider: &Collider) -> MaterialId {
    MaterialId(u32::try_from(collider.user_data).unwrap_or_default())
}
