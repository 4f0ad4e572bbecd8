#[macro_use]
mod common;

#[cfg(test)]
mod this {
    tests! {
        in_method in this is OK
        "baz"
    }

    tests! {
        in_closure in this is OK
        "Foo"
    }

    tests! {
        at_top_level in this is ERR(65)
        "[line 1] Error at 'this': Can't use 'this' outside of a class."
    }

    tests! {
        in_function in this is ERR(65)
        "[line 2] Error at 'this': Can't use 'this' outside of a class."
    }
}
