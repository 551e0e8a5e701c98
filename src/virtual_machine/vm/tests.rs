use super::*;
use crate::virtual_machine::assembler::assemble_source;
use crate::virtual_machine::errors::BytecodeReason;

fn vm_for(source: &str) -> VM {
    VM::new(assemble_source(source).expect("assembly failed"))
}

fn run_vm(source: &str) -> VM {
    let mut vm = vm_for(source);
    vm.run(StepLimit::Unbounded).expect("vm run failed");
    vm
}

/// Steps until the next step would fault, returning that fault.
fn run_until_fault(vm: &mut VM) -> Fault {
    loop {
        if let Err(fault) = vm.step() {
            return fault;
        }
        assert!(!vm.is_halted(), "program halted without faulting");
    }
}

fn stack_after(source: &str) -> Vec<i64> {
    run_vm(source).stack().to_vec()
}

// ==================== Concrete scenarios ====================

#[test]
fn push_then_halt() {
    let vm = run_vm("push 10\nhalt");
    assert!(vm.is_halted());
    assert_eq!(vm.stack(), &[10]);
    assert_eq!(vm.ip(), 2);
}

#[test]
fn counting_loop_with_step_limit() {
    let mut vm = vm_for(
        "push 0
         loop:
         dup 0
         push 1
         plusi
         jmp loop",
    );
    assert_eq!(vm.run(StepLimit::Bounded(10)), Ok(10));
    assert!(!vm.is_halted());
    assert_eq!(vm.stack(), &[0, 1, 2, 2]);
    assert_eq!(vm.ip(), 2);
}

#[test]
fn counting_loop_grows_monotonically() {
    let mut vm = vm_for("push 0\nloop: dup 0\npush 1\nplusi\njmp loop");
    vm.step().unwrap();
    for expected in 1..=20i64 {
        vm.run(StepLimit::Bounded(4)).unwrap();
        assert_eq!(vm.stack().last(), Some(&expected));
        assert_eq!(vm.ip(), 1);
    }
    assert_eq!(vm.stack().len(), 21);
}

#[test]
fn gt_uses_value_below_top_as_left_operand() {
    assert_eq!(stack_after("push 3\npush 5\ngt\nhalt"), vec![0]);
    assert_eq!(stack_after("push 5\npush 3\ngt\nhalt"), vec![1]);
}

#[test]
fn comparisons_on_equal_values() {
    assert_eq!(stack_after("push 4\npush 4\ngte\nhalt"), vec![1]);
    assert_eq!(stack_after("push 4\npush 4\nlte\nhalt"), vec![1]);
    assert_eq!(stack_after("push 4\npush 4\nlt\nhalt"), vec![0]);
    assert_eq!(stack_after("push 4\npush 4\ngt\nhalt"), vec![0]);
    assert_eq!(stack_after("push -1\npush 4\nlt\nhalt"), vec![1]);
}

// ==================== Arithmetic ====================

#[test]
fn arithmetic_operand_order() {
    assert_eq!(stack_after("push 10\npush 3\nplusi\nhalt"), vec![13]);
    assert_eq!(stack_after("push 10\npush 3\nminusi\nhalt"), vec![7]);
    assert_eq!(stack_after("push 10\npush 3\nmuli\nhalt"), vec![30]);
    assert_eq!(stack_after("push 10\npush 3\ndivi\nhalt"), vec![3]);
    assert_eq!(stack_after("push 10\npush 3\nmodi\nhalt"), vec![1]);
}

#[test]
fn division_truncates_toward_zero() {
    assert_eq!(stack_after("push -7\npush 2\ndivi\nhalt"), vec![-3]);
    assert_eq!(stack_after("push -7\npush 2\nmodi\nhalt"), vec![-1]);
    assert_eq!(stack_after("push 7\npush -2\nmodi\nhalt"), vec![1]);
}

#[test]
fn arithmetic_wraps() {
    let max = i64::MAX;
    let min = i64::MIN;
    assert_eq!(
        stack_after(&format!("push {max}\npush 1\nplusi\nhalt")),
        vec![min]
    );
    assert_eq!(
        stack_after(&format!("push {min}\npush -1\ndivi\nhalt")),
        vec![min]
    );
    assert_eq!(
        stack_after(&format!("push {min}\npush -1\nmodi\nhalt")),
        vec![0]
    );
}

#[test]
fn division_by_zero_faults_without_mutation() {
    for op in ["divi", "modi"] {
        let mut vm = vm_for(&format!("push 1\npush 0\n{op}\nhalt"));
        assert_eq!(run_until_fault(&mut vm), Fault::DivisionByZero);
        assert_eq!(vm.ip(), 2);
        assert_eq!(vm.stack(), &[1, 0]);
    }
}

#[test]
fn binary_op_leaves_rest_of_stack() {
    assert_eq!(stack_after("push 9\npush 2\npush 3\nplusi\nhalt"), vec![9, 5]);
}

// ==================== Stack faults ====================

#[test]
fn plusi_underflow_leaves_ip_unchanged() {
    let mut vm = vm_for("push 1\nplusi");
    vm.step().unwrap();
    assert_eq!(vm.step(), Err(Fault::StackUnderflow));
    assert_eq!(vm.ip(), 1);
    assert_eq!(vm.stack(), &[1]);
}

#[test]
fn every_binary_op_underflows_on_empty_stack() {
    for op in [
        "plusi", "minusi", "muli", "divi", "modi", "gt", "gte", "lt", "lte",
    ] {
        let mut vm = vm_for(op);
        assert_eq!(vm.step(), Err(Fault::StackUnderflow), "{op}");
        assert_eq!(vm.ip(), 0);
    }
}

#[test]
fn dup_zero_duplicates_top() {
    assert_eq!(stack_after("push 1\npush 2\ndup 0\nhalt"), vec![1, 2, 2]);
    assert_eq!(stack_after("push 1\npush 2\ndup 1\nhalt"), vec![1, 2, 1]);
}

#[test]
fn dup_at_stack_size_underflows() {
    let mut vm = vm_for("push 1\npush 2\ndup 2");
    assert_eq!(run_until_fault(&mut vm), Fault::StackUnderflow);
    assert_eq!(vm.ip(), 2);
    assert_eq!(vm.stack(), &[1, 2]);
}

#[test]
fn dup_negative_depth_underflows() {
    let mut vm = vm_for("push 1\ndup -1");
    assert_eq!(run_until_fault(&mut vm), Fault::StackUnderflow);
}

#[test]
fn push_overflow() {
    let limits = Limits {
        stack_capacity: 2,
        ..Limits::default()
    };
    let program = assemble_source("push 1\npush 2\npush 3").unwrap();
    let mut vm = VM::with_limits(program, limits);
    assert_eq!(vm.run(StepLimit::Unbounded), Err(Fault::StackOverflow));
    assert_eq!(vm.ip(), 2);
    assert_eq!(vm.stack(), &[1, 2]);
}

#[test]
fn dup_on_full_stack_overflows_before_depth_check() {
    let limits = Limits {
        stack_capacity: 1,
        ..Limits::default()
    };
    let program = assemble_source("push 1\ndup 5").unwrap();
    let mut vm = VM::with_limits(program, limits);
    assert_eq!(vm.run(StepLimit::Unbounded), Err(Fault::StackOverflow));
}

#[test]
fn default_stack_capacity_is_1024() {
    let mut vm = vm_for("loop: push 7\njmp loop");
    assert_eq!(vm.run(StepLimit::Unbounded), Err(Fault::StackOverflow));
    assert_eq!(vm.stack().len(), 1024);
}

// ==================== Control flow ====================

#[test]
fn jmp_if_taken_pops_condition() {
    let vm = run_vm("push 1\njmp_if skip\npush 99\nskip: halt");
    assert!(vm.stack().is_empty());
}

#[test]
fn jmp_if_not_taken_pops_condition() {
    let vm = run_vm("push 0\njmp_if skip\npush 99\nskip: halt");
    assert_eq!(vm.stack(), &[99]);
}

#[test]
fn jmp_if_treats_any_nonzero_as_true() {
    let vm = run_vm("push -5\njmp_if skip\npush 99\nskip: halt");
    assert!(vm.stack().is_empty());
}

#[test]
fn jmp_if_underflow() {
    let mut vm = vm_for("x: jmp_if x");
    assert_eq!(vm.step(), Err(Fault::StackUnderflow));
    assert_eq!(vm.ip(), 0);
}

#[test]
fn countdown_loop_terminates() {
    let vm = run_vm(
        "push 5
         loop:
           push 1
           minusi
           dup 0
           jmp_if loop
         halt",
    );
    assert_eq!(vm.stack(), &[0]);
}

#[test]
fn jump_to_negative_address_faults_at_jump() {
    let program =
        Program::from_instructions(vec![Instruction::push(1), Instruction::jmp_if(-1)]).unwrap();
    let mut vm = VM::new(program);
    assert_eq!(run_until_fault(&mut vm), Fault::IllegalInstruction);
    assert_eq!(vm.ip(), 1);
    assert_eq!(vm.stack(), &[1]);
}

#[test]
fn jump_past_end_faults_on_next_step() {
    let program = Program::from_instructions(vec![Instruction::jmp(7)]).unwrap();
    let mut vm = VM::new(program);
    vm.step().unwrap();
    assert_eq!(vm.ip(), 7);
    assert_eq!(vm.step(), Err(Fault::IllegalInstruction));
}

#[test]
fn running_off_the_end_is_illegal() {
    let mut vm = vm_for("push 1\nnop");
    assert_eq!(vm.run(StepLimit::Unbounded), Err(Fault::IllegalInstruction));
    assert_eq!(vm.ip(), 2);
    assert_eq!(vm.stack(), &[1]);
}

#[test]
fn empty_program_is_illegal() {
    let mut vm = VM::default();
    assert_eq!(vm.step(), Err(Fault::IllegalInstruction));
}

// ==================== Run loop ====================

#[test]
fn halted_machine_does_not_advance() {
    let mut vm = run_vm("halt\npush 1");
    assert_eq!(vm.ip(), 1);
    vm.step().unwrap();
    assert_eq!(vm.ip(), 1);
    assert!(vm.stack().is_empty());
    assert_eq!(vm.run(StepLimit::Unbounded), Ok(0));
}

#[test]
fn zero_step_limit_does_nothing() {
    let mut vm = vm_for("push 1\nhalt");
    assert_eq!(vm.run(StepLimit::Bounded(0)), Ok(0));
    assert_eq!(vm.ip(), 0);
}

#[test]
fn run_stops_at_halt_before_limit() {
    let mut vm = vm_for("push 1\nhalt\npush 2");
    assert_eq!(vm.run(StepLimit::Bounded(100)), Ok(2));
    assert_eq!(vm.stack(), &[1]);
}

#[test]
fn run_reports_first_fault() {
    let mut vm = vm_for("push 1\nplusi\nhalt");
    assert_eq!(vm.run(StepLimit::Bounded(69)), Err(Fault::StackUnderflow));
    assert_eq!(vm.ip(), 1);
    assert!(!vm.is_halted());
}

#[test]
fn current_instruction_tracks_ip() {
    let mut vm = vm_for("push 1\nhalt");
    assert_eq!(vm.current_instruction(), Some(&Instruction::push(1)));
    vm.step().unwrap();
    assert_eq!(
        vm.current_instruction(),
        Some(&Instruction::bare(Opcode::Halt))
    );
    vm.step().unwrap();
    assert_eq!(vm.current_instruction(), None);
}

// ==================== Loading ====================

#[test]
fn load_bytecode_runs_serialized_program() {
    let bytes = assemble_source("push 10\nhalt").unwrap().to_bytes();
    let mut vm = VM::default();
    vm.load_bytecode(&bytes).unwrap();
    vm.run(StepLimit::Unbounded).unwrap();
    assert_eq!(vm.stack(), &[10]);
}

#[test]
fn load_bad_magic_leaves_machine_untouched() {
    let mut vm = vm_for("push 4\npush 5\nhalt");
    vm.step().unwrap();
    let before = vm.program().clone();

    let mut bytes = assemble_source("nop").unwrap().to_bytes();
    bytes[1] = 0xFF;
    let err = vm.load_bytecode(&bytes).unwrap_err();

    assert!(matches!(err.reason, BytecodeReason::BadMagic { .. }));
    assert_eq!(vm.program(), &before);
    assert_eq!(vm.ip(), 1);
    assert_eq!(vm.stack(), &[4]);
}

#[test]
fn load_respects_program_capacity() {
    let limits = Limits {
        program_capacity: 1,
        ..Limits::default()
    };
    let bytes = assemble_source("nop\nhalt").unwrap().to_bytes();
    let mut vm = VM::with_limits(Program::new(), limits);
    let err = vm.load_bytecode(&bytes).unwrap_err();
    assert!(matches!(
        err.reason,
        BytecodeReason::TooLarge {
            count: 2,
            capacity: 1
        }
    ));
}

#[test]
fn load_program_resets_state() {
    let mut vm = run_vm("push 3\nhalt");
    vm.load_program(assemble_source("push 8\nhalt").unwrap());
    assert!(!vm.is_halted());
    assert_eq!(vm.ip(), 0);
    assert!(vm.stack().is_empty());
    vm.run(StepLimit::Unbounded).unwrap();
    assert_eq!(vm.stack(), &[8]);
}

// ==================== Stack dump ====================

#[test]
fn dump_stack_lists_values() {
    let vm = run_vm("push 1\npush -2\nhalt");
    let mut out = Vec::new();
    vm.dump_stack(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Stack:\n    1\n    -2\n");
}

#[test]
fn dump_empty_stack() {
    let vm = VM::default();
    let mut out = Vec::new();
    vm.dump_stack(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "Stack:\n[empty]\n");
}
