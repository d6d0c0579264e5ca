use crate::hardware::cpu::tests::initial_cpu;
use crate::hardware::mmu::MemoryMapper;
use crate::io::interrupts::InterruptFlags;

/// `DI` followed by `HALT` with a pending+enabled interrupt doesn't actually stop the CPU
/// (IME is off, so nothing would ever clear the halted state), but it also fails to advance
/// `PC` past the `HALT` opcode. The next fetch re-reads and re-executes whatever follows
/// `HALT` a second time before the CPU notices anything is wrong.
///
/// Program: NOP; XOR A; DI; NOP; HALT; INC A; NOP * 3; JP 0x0109 (spins in place).
/// With the bug, `INC A` at 0x05 runs twice, landing `A` on 2 instead of 1.
#[test]
fn halt_bug_duplicates_the_following_instruction() {
    let program = [
        0x00u8, 0xAF, 0xF3, 0x00, 0x76, 0x3C, 0x00, 0x00, 0x00, 0xC3, 0x09, 0x01,
    ];
    let mut cpu = initial_cpu();
    for (offset, byte) in program.iter().enumerate() {
        cpu.mmu.write_byte(offset as u16, *byte);
    }
    cpu.registers.pc = 0;

    cpu.mmu.interrupts_mut().overwrite_ie(InterruptFlags::VBLANK.bits());
    cpu.mmu.interrupts_mut().overwrite_if(InterruptFlags::VBLANK.bits());

    // Run until the program parks itself in the `JP 0x0109` loop at the end.
    for _ in 0..64 {
        if cpu.registers.pc == 0x0109 {
            break;
        }
        cpu.step_cycle().unwrap();
    }

    assert_eq!(cpu.registers.pc, 0x0109);
    assert_eq!(cpu.registers.a, 2);
}
