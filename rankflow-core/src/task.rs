use std::any::Any;
use std::marker::PhantomData;

/// Type-erased value passed between tasks
pub type Payload = Box<dyn Any + Send + Sync>;

/// Upstream values handed to an operator
pub enum Args<'a> {
    One(&'a Payload),
    Two(&'a Payload, &'a Payload)
}

/// Body of a task.  Returns None when the arguments don't have the expected shape.
pub trait Operator: Send + Sync {
    fn eval(&self, args: Args) -> Option<Payload>;
}

pub struct Unary<A, B, F>(F, PhantomData<fn(&A) -> B>);

impl <A, B, F: Fn(&A) -> B> Unary<A, B, F> {
    pub fn new(f: F) -> Self {
        Unary(f, PhantomData)
    }
}

impl <A, B, F> Operator for Unary<A, B, F>
        where A: Any + Send + Sync,
              B: Any + Send + Sync,
              F: Send + Sync + Fn(&A) -> B {

    fn eval(&self, args: Args) -> Option<Payload> {
        match args {
            Args::One(a) => a.downcast_ref::<A>().map(|a| {
                let out: Payload = Box::new((self.0)(a));
                out
            }),
            Args::Two(..) => None
        }
    }
}

pub struct Binary<A, B, C, F>(F, PhantomData<fn(&A, &B) -> C>);

impl <A, B, C, F: Fn(&A, &B) -> C> Binary<A, B, C, F> {
    pub fn new(f: F) -> Self {
        Binary(f, PhantomData)
    }
}

impl <A, B, C, F> Operator for Binary<A, B, C, F>
        where A: Any + Send + Sync,
              B: Any + Send + Sync,
              C: Any + Send + Sync,
              F: Send + Sync + Fn(&A, &B) -> C {

    fn eval(&self, args: Args) -> Option<Payload> {
        match args {
            Args::Two(a, b) => {
                let a = a.downcast_ref::<A>()?;
                let b = b.downcast_ref::<B>()?;
                let out: Payload = Box::new((self.0)(a, b));
                Some(out)
            },
            Args::One(_) => None
        }
    }
}

#[cfg(test)]
mod task_test {
    use super::*;

    #[test]
    fn test_unary_rejects_wrong_type() {
        let op = Unary::new(|x: &usize| x + 1);
        let good: Payload = Box::new(1usize);
        let bad: Payload = Box::new("one".to_owned());

        let out = op.eval(Args::One(&good)).and_then(|p| p.downcast_ref::<usize>().copied());
        assert_eq!(out, Some(2));
        assert!(op.eval(Args::One(&bad)).is_none());
        assert!(op.eval(Args::Two(&good, &good)).is_none());
    }

    #[test]
    fn test_binary() {
        let op = Binary::new(|x: &usize, y: &String| format!("{}{}", x, y));
        let a: Payload = Box::new(3usize);
        let b: Payload = Box::new("x".to_owned());
        let out = op.eval(Args::Two(&a, &b))
            .and_then(|p| p.downcast_ref::<String>().cloned());
        assert_eq!(out, Some("3x".to_owned()));
    }
}
