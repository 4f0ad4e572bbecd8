#[macro_use]
mod common;

#[cfg(test)]
mod _super {
    tests! {
        call_same_method in super is OK
        "A"
        "B"
    }

    tests! {
        call_other_method in super is OK
        "Derived.bar()"
        "Base.foo()"
    }

    tests! {
        constructor in super is OK
        "Derived.init()"
        "Base.init(a, b)"
    }

    tests! {
        closure in super is OK
        "Base"
    }

    tests! {
        this_in_superclass_method in super is OK
        "a"
        "b"
    }

    tests! {
        no_superclass_call in super is ERR(65)
        "[line 3] Error at 'super': Can't use 'super' in a class with no superclass."
    }

    tests! {
        missing_method in super is ERR(70)
        "Undefined property 'doesNotExist'."
        "[line 5]"
    }

    tests! {
        at_top_level in super is ERR(65)
        "[line 1] Error at 'super': Can't use 'super' outside of a class."
    }
}
