//! Classified intersection results.

/// Outcome of intersecting a query segment with a boundary element
/// (another segment, a plane, or a wall polygon).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intersection<P> {
    /// The objects do not meet.
    None,
    /// Clean crossing, away from every endpoint and edge.
    Proper(P),
    /// The hit is at an endpoint of the query segment.
    Endpoint(P),
    /// The hit is on the boundary of the element being crossed, or the two
    /// objects overlap along a shared stretch.
    Boundary(P),
}

impl<P: Copy> Intersection<P> {
    /// Intersection point, if the objects meet.
    pub fn point(&self) -> Option<P> {
        match *self {
            Intersection::None => None,
            Intersection::Proper(p) | Intersection::Endpoint(p) | Intersection::Boundary(p) => {
                Some(p)
            }
        }
    }

    /// Whether the objects meet at all.
    pub fn is_hit(&self) -> bool {
        !matches!(self, Intersection::None)
    }

    /// Whether the element is crossed away from the query's endpoints.
    ///
    /// This is what blocks a line of sight: touching at the very start or end
    /// of the query segment does not.
    pub fn is_interior_crossing(&self) -> bool {
        matches!(self, Intersection::Proper(_) | Intersection::Boundary(_))
    }

    /// Transform the carried point, keeping the classification.
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> Intersection<Q> {
        match self {
            Intersection::None => Intersection::None,
            Intersection::Proper(p) => Intersection::Proper(f(p)),
            Intersection::Endpoint(p) => Intersection::Endpoint(f(p)),
            Intersection::Boundary(p) => Intersection::Boundary(f(p)),
        }
    }
}
