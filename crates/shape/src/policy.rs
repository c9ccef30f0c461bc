/// Interpretation of a requested size along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizePolicy {
    /// Weight sharing whatever the absolute parts leave over.
    Relative,
    /// Native units of the axis.
    AbsoluteTrue,
    /// Arc length on the inner radius (cylindrical angle axis only).
    AbsoluteInner,
    /// Arc length on the outer radius (cylindrical angle axis only).
    AbsoluteOuter,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub policy: SizePolicy,
    pub value: f64,
}

impl Size {
    pub fn new(policy: SizePolicy, value: f64) -> Self {
        Self { policy, value }
    }

    pub fn relative(value: f64) -> Self {
        Self::new(SizePolicy::Relative, value)
    }

    pub fn absolute(value: f64) -> Self {
        Self::new(SizePolicy::AbsoluteTrue, value)
    }

    pub fn inner(value: f64) -> Self {
        Self::new(SizePolicy::AbsoluteInner, value)
    }

    pub fn outer(value: f64) -> Self {
        Self::new(SizePolicy::AbsoluteOuter, value)
    }
}

/// One part of a subdivision. Hidden parts consume space but create no child.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub name: String,
    pub size: Size,
    pub visible: bool,
}

impl Split {
    pub fn new(name: impl Into<String>, size: Size) -> Self {
        Self {
            name: name.into(),
            size,
            visible: true,
        }
    }

    pub fn relative(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Size::relative(value))
    }

    pub fn absolute(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Size::absolute(value))
    }

    pub fn inner(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Size::inner(value))
    }

    pub fn outer(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, Size::outer(value))
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// Where the leftover of a repeat goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingType {
    Low,
    High,
    #[default]
    Balance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub kind: PaddingType,
    /// Create `"Padding"` children for the leftover.
    pub visible: bool,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            kind: PaddingType::Balance,
            visible: true,
        }
    }
}

impl Padding {
    pub fn new(kind: PaddingType, visible: bool) -> Self {
        Self { kind, visible }
    }

    pub fn hidden(kind: PaddingType) -> Self {
        Self::new(kind, false)
    }
}

/// How siblings combine into this node's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildChildOperator {
    #[default]
    Unite,
    /// The node's mesh is the boolean intersection of its children.
    Intersect,
}

/// Whether a composite node also draws its own primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParentChildOperator {
    /// Pure grouping node.
    #[default]
    None,
    Unite,
    /// `Intersect` and `Subtract` are drawn like `Unite`; the parent-level
    /// combination is not carried out.
    Intersect,
    Subtract,
}
